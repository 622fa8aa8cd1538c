//! # Payment Document Status Derivation
//!
//! Derives an installment's status from amounts and dates.
//!
//! ## Derivation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 derive_status(amount, paid, due, today)                 │
//! │                                                                         │
//! │  paid >= amount            ──► paid                                    │
//! │  0 < paid < amount         ──► partially_paid   (even when overdue!)   │
//! │  paid == 0, due <  today   ──► overdue                                 │
//! │  paid == 0, due >= today   ──► pending                                 │
//! │                                                                         │
//! │  Statuses are DERIVED, never chosen. Re-deriving with the same        │
//! │  inputs always yields the same status (the overdue sweep relies on    │
//! │  this for idempotence).                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::money::Money;
use crate::types::{Installment, InstallmentStatus};

/// Derives the payment status of an installment.
///
/// Pure function of `(amount, paid_amount, due_date, today)`. A partial
/// payment suppresses `overdue` regardless of the due date - the document
/// is in negotiation, not ignored.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meridian_core::money::Money;
/// use meridian_core::receivable::derive_status;
/// use meridian_core::types::InstallmentStatus;
///
/// let due = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
/// let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
///
/// // Past due, nothing paid
/// let status = derive_status(Money::from_cents(50_000), Money::zero(), due, today);
/// assert_eq!(status, InstallmentStatus::Overdue);
///
/// // Past due but partially paid
/// let status = derive_status(Money::from_cents(50_000), Money::from_cents(25_000), due, today);
/// assert_eq!(status, InstallmentStatus::PartiallyPaid);
/// ```
pub fn derive_status(
    amount: Money,
    paid_amount: Money,
    due_date: NaiveDate,
    today: NaiveDate,
) -> InstallmentStatus {
    if paid_amount >= amount {
        return InstallmentStatus::Paid;
    }

    if paid_amount.is_positive() {
        return InstallmentStatus::PartiallyPaid;
    }

    if due_date < today {
        InstallmentStatus::Overdue
    } else {
        InstallmentStatus::Pending
    }
}

/// Re-derives the status of a stored installment against `today`.
///
/// Returns `Some(new_status)` when the stored status is stale, `None` when
/// it already matches. The overdue sweep updates only the `Some` rows.
pub fn refreshed_status(installment: &Installment, today: NaiveDate) -> Option<InstallmentStatus> {
    let derived = derive_status(
        installment.amount(),
        installment.paid_amount(),
        installment.due_date,
        today,
    );

    if derived != installment.status {
        Some(derived)
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
