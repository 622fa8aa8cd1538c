//! # Installment Schedule Generator
//!
//! Splits a credit order's total into N dated installments.
//!
//! ## Splitting Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Schedule Generation                                    │
//! │                                                                         │
//! │  total = 1000.00, count = 3, first due date = 2026-02-01               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  base = floor(100000 / 3) = 33333                                      │
//! │  last = 100000 − 33333 × 2 = 33334                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  #1  333.33  due 2026-02-01   (+0 days)                                │
//! │  #2  333.33  due 2026-03-03   (+30 days)                               │
//! │  #3  333.34  due 2026-04-02   (+60 days)  ← absorbs the remainder      │
//! │                                                                         │
//! │  Σ amounts == total, cent-accurate, ALWAYS                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Generation is pure; persisting the set atomically (and replacing an
//! existing schedule wholesale) is the engine/db layer's job.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_installment_count;
use crate::DEFAULT_INSTALLMENT_INTERVAL_DAYS;

/// One generated installment, before persistence assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScheduledInstallment {
    /// 1-based position within the schedule.
    pub number: u32,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Informational day count, initialized from the due-date gap but
    /// free-editable afterwards (it is metadata, not derived state).
    pub days_due: i64,
}

impl ScheduledInstallment {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Generates an installment schedule for a credit order.
///
/// ## Arguments
/// * `total` - The order total to split. Must be positive.
/// * `count` - Number of installments, 1..=MAX_INSTALLMENTS.
/// * `first_due_date` - Due date of installment #1.
/// * `interval_days` - Gap between consecutive due dates; None for the
///   default of 30 calendar days.
///
/// ## Guarantees
/// - Σ amount == total, exactly, to the cent
/// - Installment numbers are 1..=count, contiguous
/// - Only the LAST installment may differ from the uniform base amount
///
/// ## Errors
/// `CoreError::InvalidScheduleParameters` when count is out of range or
/// total is not positive. All-or-nothing: on error no installments exist.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use meridian_core::money::Money;
/// use meridian_core::schedule::generate_schedule;
///
/// let first_due = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
/// let schedule = generate_schedule(Money::from_cents(100_000), 3, first_due, None).unwrap();
///
/// let amounts: Vec<i64> = schedule.iter().map(|i| i.amount_cents).collect();
/// assert_eq!(amounts, vec![33_333, 33_333, 33_334]);
/// ```
pub fn generate_schedule(
    total: Money,
    count: u32,
    first_due_date: NaiveDate,
    interval_days: Option<i64>,
) -> CoreResult<Vec<ScheduledInstallment>> {
    validate_installment_count(count)
        .map_err(|e| CoreError::invalid_schedule(e.to_string()))?;

    if !total.is_positive() {
        return Err(CoreError::invalid_schedule(
            "order total must be positive to generate a schedule",
        ));
    }

    let interval = interval_days.unwrap_or(DEFAULT_INSTALLMENT_INTERVAL_DAYS);
    if interval < 0 {
        return Err(CoreError::invalid_schedule(
            "interval between due dates must not be negative",
        ));
    }

    let count_i64 = count as i64;
    let base = total.cents() / count_i64;
    // The last installment absorbs the rounding remainder
    let last = total.cents() - base * (count_i64 - 1);

    let mut schedule = Vec::with_capacity(count as usize);
    for k in 1..=count {
        let offset_days = (k as i64 - 1) * interval;
        let amount_cents = if k == count { last } else { base };

        schedule.push(ScheduledInstallment {
            number: k,
            amount_cents,
            due_date: first_due_date + Duration::days(offset_days),
            days_due: offset_days,
        });
    }

    debug_assert_eq!(
        schedule.iter().map(|i| i.amount_cents).sum::<i64>(),
        total.cents()
    );

    Ok(schedule)
}

// =============================================================================
// Unit Tests
// =============================================================================
