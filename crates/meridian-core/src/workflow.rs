//! # Order Status State Machine
//!
//! Validates order status transitions against a role-gated target table.
//!
//! ## Transition Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Order Status Workflow                                  │
//! │                                                                         │
//! │  draft ──► taken ──► confirmed ──► in_preparation ──► dispatched       │
//! │                                                                         │
//! │  Normal operation walks left to right, but the machine does NOT        │
//! │  hard-block other jumps: any target different from the current status  │
//! │  is accepted if the actor's role allows it, so operators can correct   │
//! │  mistakes (including moving out of dispatched).                        │
//! │                                                                         │
//! │  Role gating (data-driven, not scattered branches):                    │
//! │    sales          → { draft, taken }                                   │
//! │    manager/admin  → all five statuses                                  │
//! │                                                                         │
//! │  Editability is a separate concern: items and schedule may only be     │
//! │  touched while the order is draft or taken.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persisting the transition (order update + status log append in one
//! transaction) is the engine's job; this module only decides legality.

use crate::error::{CoreError, CoreResult};
use crate::types::{OrderStatus, Role};

/// Statuses a sales actor may move an order between.
const SALES_TARGETS: [OrderStatus; 2] = [OrderStatus::Draft, OrderStatus::Taken];

/// Returns the set of target statuses the given role may choose.
///
/// A data-driven allow-list: adding a role or widening a role's reach is a
/// table change here, not a hunt through condition branches.
pub const fn allowed_targets(role: Role) -> &'static [OrderStatus] {
    match role {
        Role::Sales => &SALES_TARGETS,
        Role::Manager | Role::Admin => &OrderStatus::ALL,
    }
}

/// Validates a status transition without performing it.
///
/// ## Rules
/// - The target must differ from the current status (`InvalidTransition`)
/// - The target must be in the actor role's allow-list (`Forbidden`)
///
/// Role check order: the no-op check runs first, so a sales actor asking
/// for "taken → taken" sees `InvalidTransition`, not `Forbidden`.
///
/// ## Example
/// ```rust
/// use meridian_core::types::{OrderStatus, Role};
/// use meridian_core::workflow::validate_transition;
///
/// assert!(validate_transition(OrderStatus::Draft, OrderStatus::Taken, Role::Sales).is_ok());
/// assert!(validate_transition(OrderStatus::Taken, OrderStatus::Confirmed, Role::Sales).is_err());
/// ```
pub fn validate_transition(
    current: OrderStatus,
    target: OrderStatus,
    role: Role,
) -> CoreResult<()> {
    if target == current {
        return Err(CoreError::InvalidTransition { status: current });
    }

    if !allowed_targets(role).contains(&target) {
        return Err(CoreError::Forbidden { role, target });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_targets() {
        assert_eq!(
            allowed_targets(Role::Sales),
            &[OrderStatus::Draft, OrderStatus::Taken]
        );
    }

    #[test]
    fn test_elevated_roles_get_all_targets() {
        assert_eq!(allowed_targets(Role::Manager).len(), 5);
        assert_eq!(allowed_targets(Role::Admin).len(), 5);
    }

    #[test]
    fn test_noop_transition_rejected() {
        for status in OrderStatus::ALL {
            let err = validate_transition(status, status, Role::Admin).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_sales_cannot_confirm() {
        let err =
            validate_transition(OrderStatus::Taken, OrderStatus::Confirmed, Role::Sales)
                .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));
    }

    #[test]
    fn test_sales_can_move_between_draft_and_taken() {
        assert!(validate_transition(OrderStatus::Draft, OrderStatus::Taken, Role::Sales).is_ok());
        assert!(validate_transition(OrderStatus::Taken, OrderStatus::Draft, Role::Sales).is_ok());
    }

    #[test]
    fn test_admin_can_skip_forward() {
        // No numeric skip prevention: draft straight to dispatched is legal
        // for elevated roles
        assert!(
            validate_transition(OrderStatus::Draft, OrderStatus::Dispatched, Role::Admin).is_ok()
        );
    }

    #[test]
    fn test_admin_can_move_out_of_dispatched() {
        // Dispatched is terminal in normal flow but corrections are allowed
        assert!(validate_transition(
            OrderStatus::Dispatched,
            OrderStatus::InPreparation,
            Role::Manager
        )
        .is_ok());
    }

    #[test]
    fn test_noop_beats_forbidden() {
        // Sales asking draft→draft: the no-op check fires first
        let err = validate_transition(OrderStatus::Draft, OrderStatus::Draft, Role::Sales)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }
}
