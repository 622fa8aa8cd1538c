//! # Receivables Aggregator
//!
//! Portfolio-wide totals and counts per installment status.
//!
//! Pure aggregation over a snapshot of installments - there is no persisted
//! running total. The engine recomputes this after every sweep or payment
//! registration so reports never show stale numbers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Installment, InstallmentStatus};

/// Portfolio statistics for the receivables report.
///
/// For pending/overdue/partially-paid documents the REMAINING balance
/// (amount − paid) is accumulated; for paid documents the full amount is,
/// so "total paid" reflects money actually collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceivablesSummary {
    pub total_pending_cents: i64,
    pub total_overdue_cents: i64,
    pub total_partially_paid_cents: i64,
    pub total_paid_cents: i64,

    pub count_pending: u64,
    pub count_overdue: u64,
    pub count_partially_paid: u64,
    pub count_paid: u64,
}

impl ReceivablesSummary {
    /// Computes the summary from a snapshot of installments.
    ///
    /// ## Example
    /// ```text
    /// installments:
    ///   #1 pending        500.00 paid   0.00 → pending bucket  +500.00
    ///   #2 overdue        500.00 paid   0.00 → overdue bucket  +500.00
    ///   #3 partially_paid 500.00 paid 200.00 → partial bucket  +300.00
    ///   #4 paid           500.00 paid 500.00 → paid bucket     +500.00
    /// ```
    pub fn compute(installments: &[Installment]) -> Self {
        let mut summary = ReceivablesSummary::default();

        for installment in installments {
            match installment.status {
                InstallmentStatus::Pending => {
                    summary.total_pending_cents += installment.remaining().cents();
                    summary.count_pending += 1;
                }
                InstallmentStatus::Overdue => {
                    summary.total_overdue_cents += installment.remaining().cents();
                    summary.count_overdue += 1;
                }
                InstallmentStatus::PartiallyPaid => {
                    summary.total_partially_paid_cents += installment.remaining().cents();
                    summary.count_partially_paid += 1;
                }
                InstallmentStatus::Paid => {
                    summary.total_paid_cents += installment.amount_cents;
                    summary.count_paid += 1;
                }
            }
        }

        summary
    }

    /// Total number of installments counted.
    pub fn total_count(&self) -> u64 {
        self.count_pending + self.count_overdue + self.count_partially_paid + self.count_paid
    }

    /// Total outstanding balance across all unpaid buckets.
    pub fn total_outstanding_cents(&self) -> i64 {
        self.total_pending_cents + self.total_overdue_cents + self.total_partially_paid_cents
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
