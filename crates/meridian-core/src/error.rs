//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  meridian-engine errors (separate crate)                               │
//! │  └── EngineError      - What callers see (wraps the above)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (status, amounts, role)
//! 3. Errors are enum variants, never String
//! 4. Each variant is a machine-readable kind with a human-readable message

use thiserror::Error;

use crate::types::{OrderStatus, Role};

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule violations.
///
/// Every variant is rejected *before* any write - callers never observe
/// partial state change from one of these.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A status transition was requested to the status the order is
    /// already in. No-op transitions are rejected rather than silently
    /// logged, so the audit trail only contains real changes.
    #[error("Order is already {status:?}, transition must change the status")]
    InvalidTransition { status: OrderStatus },

    /// The actor's role does not allow the requested target status.
    ///
    /// ## When This Occurs
    /// - A sales actor tries to move an order beyond taken
    #[error("Role {role:?} is not allowed to set status {target:?}")]
    Forbidden { role: Role, target: OrderStatus },

    /// The order status freezes items and schedule.
    ///
    /// ## When This Occurs
    /// - Adding/updating/removing an item on a confirmed order
    /// - Regenerating the schedule after the order left draft/taken
    #[error("Order is {status:?} and can no longer be edited")]
    OrderNotEditable { status: OrderStatus },

    /// A payment registration exceeded the installment amount.
    ///
    /// ## User Workflow
    /// ```text
    /// Register payment: 600.00 against a 500.00 installment
    ///      │
    ///      ▼
    /// OverpaymentRejected { amount: 50000, attempted: 60000 }
    ///      │
    ///      ▼
    /// UI shows: "Payment exceeds the installment amount"
    /// ```
    #[error("Payment of {attempted_cents} cents exceeds installment amount of {amount_cents} cents")]
    OverpaymentRejected {
        amount_cents: i64,
        attempted_cents: i64,
    },

    /// Schedule generation was aborted; nothing was persisted.
    ///
    /// ## When This Occurs
    /// - installment count is zero or above the configured maximum
    /// - order total is not positive
    /// - order is not a credit sale, or has no installment count set
    /// - a payment was already registered against the existing schedule
    #[error("Invalid schedule parameters: {reason}")]
    InvalidScheduleParameters { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidScheduleParameters error.
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        CoreError::InvalidScheduleParameters {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
