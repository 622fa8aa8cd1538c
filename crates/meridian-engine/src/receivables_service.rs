//! # Receivables Service
//!
//! Payment registration, the overdue sweep, and receivables reporting.
//!
//! ## Payment Registration Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_payment(installment_id, amount, date, notes)                 │
//! │                                                                         │
//! │  1. Load installment           → InstallmentNotFound                   │
//! │  2. Validate amount >= 0       → ValidationError                       │
//! │  3. Reject amount > due        → OverpaymentRejected                   │
//! │  4. Derive status from         → paid / partially_paid / overdue /     │
//! │     (amount, paid, due, date)    pending (never chosen by the caller)  │
//! │  5. Write guarded by version   → ConcurrentModification on mismatch    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The overdue sweep re-derives every unpaid installment's status against
//! a reference date and persists only the stale ones. Each write is guarded
//! by the old status, so two sweeps racing on the same row apply it once.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use meridian_core::validation::{validate_observation, validate_payment_amount};
use meridian_core::{
    derive_status, refreshed_status, CoreError, Installment, InstallmentStatus, Money,
    ReceivablesSummary,
};
use meridian_db::Database;

/// Service for installment payments and receivables queries.
#[derive(Debug, Clone)]
pub struct ReceivablesService {
    db: Database,
}

impl ReceivablesService {
    /// Creates a new ReceivablesService over the given database.
    pub fn new(db: Database) -> Self {
        ReceivablesService { db }
    }

    // =========================================================================
    // Payment registration
    // =========================================================================

    /// Registers a payment against an installment.
    ///
    /// `paid_amount_cents` is the new cumulative paid amount, not a delta.
    /// Amounts above the installment amount are rejected; the status is
    /// derived from the amounts and the payment date, never passed in.
    ///
    /// Returns the updated installment.
    pub async fn register_payment(
        &self,
        installment_id: &str,
        paid_amount_cents: i64,
        payment_date: NaiveDate,
        notes: Option<&str>,
    ) -> EngineResult<Installment> {
        validate_payment_amount(paid_amount_cents).map_err(CoreError::from)?;

        let installment = self.get_installment(installment_id).await?;

        if paid_amount_cents > installment.amount_cents {
            return Err(CoreError::OverpaymentRejected {
                amount_cents: installment.amount_cents,
                attempted_cents: paid_amount_cents,
            }
            .into());
        }

        let trimmed_notes = match notes {
            Some(text) => {
                let trimmed = validate_observation(text).map_err(CoreError::from)?;
                (!trimmed.is_empty()).then(|| trimmed)
            }
            None => None,
        };

        let status = derive_status(
            installment.amount(),
            Money::from_cents(paid_amount_cents),
            installment.due_date,
            payment_date,
        );
        // A zero registration clears the payment date back out
        let payment_date = (paid_amount_cents > 0).then_some(payment_date);

        self.db
            .installments()
            .register_payment(
                installment_id,
                paid_amount_cents,
                payment_date,
                trimmed_notes.as_deref(),
                status,
                installment.version,
            )
            .await?;

        info!(
            installment_id = %installment_id,
            paid_amount_cents,
            status = ?status,
            "Payment registered"
        );
        self.get_installment(installment_id).await
    }

    /// Gets an installment by id.
    pub async fn get_installment(&self, installment_id: &str) -> EngineResult<Installment> {
        self.db
            .installments()
            .get_by_id(installment_id)
            .await?
            .ok_or_else(|| EngineError::InstallmentNotFound(installment_id.to_string()))
    }

    // =========================================================================
    // Overdue sweep
    // =========================================================================

    /// Re-derives the status of every unpaid installment against `today`.
    ///
    /// Returns how many rows changed. Safe to run repeatedly: a second
    /// sweep with the same date finds nothing stale. Writes are guarded
    /// by the previous status, so a row another writer already moved is
    /// skipped rather than clobbered.
    pub async fn run_overdue_sweep(&self, today: NaiveDate) -> EngineResult<usize> {
        let unpaid = self.db.installments().list_unpaid().await?;

        let mut applied = 0;
        for installment in &unpaid {
            let Some(new_status) = refreshed_status(installment, today) else {
                continue;
            };
            let changed = self
                .db
                .installments()
                .transition_status(&installment.id, installment.status, new_status)
                .await?;
            if changed {
                debug!(
                    installment_id = %installment.id,
                    from = ?installment.status,
                    to = ?new_status,
                    "Installment status refreshed"
                );
                applied += 1;
            }
        }

        if applied > 0 {
            info!(applied, %today, "Overdue sweep applied");
        }
        Ok(applied)
    }

    // =========================================================================
    // Queries & reporting
    // =========================================================================

    /// Lists all installments with statuses fresh as of `today`.
    pub async fn list_installments(&self, today: NaiveDate) -> EngineResult<Vec<Installment>> {
        self.run_overdue_sweep(today).await?;
        Ok(self.db.installments().list_all().await?)
    }

    /// Lists the schedule of one order, ordered by installment number.
    pub async fn order_schedule(&self, order_id: &str) -> EngineResult<Vec<Installment>> {
        Ok(self.db.installments().get_by_order(order_id).await?)
    }

    /// Lists installments in a given status, fresh as of `today`.
    ///
    /// Sweeps first like the other listing queries, so a past-due
    /// installment is never returned under `pending`.
    pub async fn list_by_status(
        &self,
        status: InstallmentStatus,
        today: NaiveDate,
    ) -> EngineResult<Vec<Installment>> {
        self.run_overdue_sweep(today).await?;
        Ok(self.db.installments().list_by_status(status).await?)
    }

    /// Lists installments due in the inclusive date window, with statuses
    /// fresh as of `today`.
    pub async fn list_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> EngineResult<Vec<Installment>> {
        self.run_overdue_sweep(today).await?;
        Ok(self.db.installments().list_due_between(from, to).await?)
    }

    /// Computes the receivables summary with statuses fresh as of `today`.
    ///
    /// Sweeps first so the aggregation never reports a past-due installment
    /// under `pending`.
    pub async fn receivables_summary(&self, today: NaiveDate) -> EngineResult<ReceivablesSummary> {
        self.run_overdue_sweep(today).await?;
        let installments = self.db.installments().list_all().await?;
        Ok(ReceivablesSummary::compute(&installments))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_service::OrderService;
    use meridian_core::{Actor, CreditType, PaymentType, Role};
    use meridian_db::DbConfig;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn uuid() -> String {
        Uuid::new_v4().to_string()
    }

    /// Builds a credit order with the given total (entered as a single
    /// tax-inclusive item subtotal) and a generated schedule.
    async fn setup_schedule(
        subtotal_cents: i64,
        count: u32,
        first_due: NaiveDate,
    ) -> (OrderService, ReceivablesService, Vec<Installment>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let orders = OrderService::new(db.clone());
        let receivables = ReceivablesService::new(db);

        let actor = Actor::new("admin-1", Role::Admin);
        let order = orders.create_order(&uuid(), &uuid(), &actor).await.unwrap();
        orders
            .add_item(&order.id, &uuid(), 1, subtotal_cents)
            .await
            .unwrap();
        orders
            .set_payment_terms(
                &order.id,
                PaymentType::Credit,
                Some(CreditType::Invoice),
                Some(count),
            )
            .await
            .unwrap();
        let schedule = orders
            .generate_order_schedule(&order.id, first_due, None)
            .await
            .unwrap();

        (orders, receivables, schedule)
    }

    #[tokio::test]
    async fn test_full_payment_marks_paid() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;
        let first = &schedule[0];

        let updated = receivables
            .register_payment(&first.id, first.amount_cents, date(2026, 1, 28), None)
            .await
            .unwrap();

        assert_eq!(updated.status, InstallmentStatus::Paid);
        assert_eq!(updated.paid_amount_cents, first.amount_cents);
        assert_eq!(updated.payment_date, Some(date(2026, 1, 28)));
        assert_eq!(updated.version, first.version + 1);
    }

    #[tokio::test]
    async fn test_partial_payment_even_past_due() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;

        // Payment dated well after the due date - still partially_paid,
        // never overdue, because money arrived
        let updated = receivables
            .register_payment(&schedule[0].id, 10_000, date(2026, 6, 1), Some("wire, part 1"))
            .await
            .unwrap();

        assert_eq!(updated.status, InstallmentStatus::PartiallyPaid);
        assert_eq!(updated.notes.as_deref(), Some("wire, part 1"));
    }

    #[tokio::test]
    async fn test_overpayment_rejected_unchanged() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;
        let first = &schedule[0];

        let err = receivables
            .register_payment(&first.id, first.amount_cents + 1, date(2026, 1, 28), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::OverpaymentRejected { .. })
        ));

        // Installment untouched
        let stored = receivables.get_installment(&first.id).await.unwrap();
        assert_eq!(stored.paid_amount_cents, 0);
        assert_eq!(stored.status, InstallmentStatus::Pending);
        assert_eq!(stored.version, first.version);
    }

    #[tokio::test]
    async fn test_negative_payment_rejected() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;

        let err = receivables
            .register_payment(&schedule[0].id, -1, date(2026, 1, 28), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_zero_payment_resets_to_derived_unpaid() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;
        let first = &schedule[0];

        receivables
            .register_payment(&first.id, 10_000, date(2026, 1, 20), None)
            .await
            .unwrap();

        // Correction back to zero: status re-derives, payment date clears
        let updated = receivables
            .register_payment(&first.id, 0, date(2026, 1, 25), None)
            .await
            .unwrap();
        assert_eq!(updated.status, InstallmentStatus::Pending);
        assert_eq!(updated.paid_amount_cents, 0);
        assert_eq!(updated.payment_date, None);
    }

    #[tokio::test]
    async fn test_unknown_installment() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let receivables = ReceivablesService::new(db);

        let err = receivables
            .register_payment("no-such-id", 1000, date(2026, 1, 1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InstallmentNotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_marks_overdue_then_partial_payment_recovers() {
        // 500.00 total: item subtotal 423.73 → tax 76.27 → total 500.00
        let (_, receivables, schedule) = setup_schedule(42_373, 1, date(2026, 2, 1)).await;
        let only = &schedule[0];
        assert_eq!(only.amount_cents, 50_000);

        // Day after due date: the sweep flips it to overdue
        let applied = receivables.run_overdue_sweep(date(2026, 2, 2)).await.unwrap();
        assert_eq!(applied, 1);
        let stored = receivables.get_installment(&only.id).await.unwrap();
        assert_eq!(stored.status, InstallmentStatus::Overdue);

        // Second sweep is a no-op
        let applied = receivables.run_overdue_sweep(date(2026, 2, 2)).await.unwrap();
        assert_eq!(applied, 0);

        // 250.00 arrives: overdue gives way to partially_paid
        let updated = receivables
            .register_payment(&only.id, 25_000, date(2026, 2, 10), None)
            .await
            .unwrap();
        assert_eq!(updated.status, InstallmentStatus::PartiallyPaid);

        // And stays that way through later sweeps
        let applied = receivables.run_overdue_sweep(date(2026, 3, 1)).await.unwrap();
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_sweep_ignores_future_and_paid() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;

        receivables
            .register_payment(&schedule[0].id, schedule[0].amount_cents, date(2026, 1, 28), None)
            .await
            .unwrap();

        // Between first and second due dates: nothing unpaid is late yet
        let applied = receivables.run_overdue_sweep(date(2026, 2, 15)).await.unwrap();
        assert_eq!(applied, 0);

        let second = receivables.get_installment(&schedule[1].id).await.unwrap();
        assert_eq!(second.status, InstallmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_summary_buckets_and_outstanding() {
        // total 1000.00 over 3 → 333.33 / 333.33 / 333.34
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;

        // #1 fully paid, #2 half paid, #3 untouched
        receivables
            .register_payment(&schedule[0].id, 33_333, date(2026, 1, 28), None)
            .await
            .unwrap();
        receivables
            .register_payment(&schedule[1].id, 16_000, date(2026, 3, 5), None)
            .await
            .unwrap();

        // As of 2026-05-01 the third (due 2026-04-02) is overdue
        let summary = receivables.receivables_summary(date(2026, 5, 1)).await.unwrap();

        assert_eq!(summary.count_paid, 1);
        assert_eq!(summary.count_partially_paid, 1);
        assert_eq!(summary.count_overdue, 1);
        assert_eq!(summary.count_pending, 0);

        assert_eq!(summary.total_paid_cents, 33_333);
        assert_eq!(summary.total_partially_paid_cents, 33_333 - 16_000);
        assert_eq!(summary.total_overdue_cents, 33_334);
        assert_eq!(summary.total_outstanding_cents(), 17_333 + 33_334);
    }

    #[tokio::test]
    async fn test_list_installments_refreshes_first() {
        let (_, receivables, schedule) = setup_schedule(42_373, 1, date(2026, 2, 1)).await;

        let listed = receivables.list_installments(date(2026, 3, 1)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, schedule[0].id);
        assert_eq!(listed[0].status, InstallmentStatus::Overdue);
    }

    #[tokio::test]
    async fn test_due_window_query_refreshes_first() {
        let (_, receivables, schedule) = setup_schedule(84_746, 3, date(2026, 2, 1)).await;

        // Queried after the first due date passed: the window query sweeps
        // before filtering, so #2 comes back already marked overdue
        let today = date(2026, 3, 10);
        let window = receivables
            .list_due_between(date(2026, 2, 15), date(2026, 3, 15), today)
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, schedule[1].id);
        assert_eq!(window[0].status, InstallmentStatus::Overdue);
    }

    #[tokio::test]
    async fn test_status_filter_refreshes_first() {
        let (_, receivables, schedule) = setup_schedule(42_373, 1, date(2026, 2, 1)).await;

        // Stored as pending, but past due at query time: the status
        // filter sees the refreshed state, never the stale one
        let today = date(2026, 3, 1);
        let pending = receivables
            .list_by_status(InstallmentStatus::Pending, today)
            .await
            .unwrap();
        assert!(pending.is_empty());

        let overdue = receivables
            .list_by_status(InstallmentStatus::Overdue, today)
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, schedule[0].id);
    }
}
