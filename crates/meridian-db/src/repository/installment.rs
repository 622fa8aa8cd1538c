//! # Installment Repository
//!
//! Database operations for installment schedules and payment registration.
//!
//! ## Installment Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Installment Lifecycle                               │
//! │                                                                         │
//! │  1. GENERATE SCHEDULE                                                  │
//! │     └── replace_schedule() → delete old set + insert new set,          │
//! │         one transaction, all-or-nothing                                │
//! │                                                                         │
//! │  2. PAYMENTS                                                           │
//! │     └── register_payment() → optimistic version check; overwrites      │
//! │         the cumulative paid_amount (single source of truth)            │
//! │                                                                         │
//! │  3. OVERDUE SWEEP                                                      │
//! │     └── transition_status() per stale row; guarded by the stored       │
//! │         status so two concurrent sweeps cannot double-apply            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{Installment, InstallmentStatus};

const INSTALLMENT_COLUMNS: &str = "id, order_id, number, amount_cents, due_date, days_due, \
     status, paid_amount_cents, payment_date, notes, version, created_at, updated_at";

/// Repository for installment database operations.
#[derive(Debug, Clone)]
pub struct InstallmentRepository {
    pool: SqlitePool,
}

impl InstallmentRepository {
    /// Creates a new InstallmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InstallmentRepository { pool }
    }

    /// Gets an installment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Installment>> {
        let installment = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(installment)
    }

    /// Gets all installments of an order, in schedule order.
    pub async fn get_by_order(&self, order_id: &str) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE order_id = ?1 ORDER BY number"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Lists all installments across all orders, due-date order.
    pub async fn list_all(&self) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments ORDER BY due_date, number"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Lists installments in a given status, due-date order.
    pub async fn list_by_status(&self, status: InstallmentStatus) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE status = ?1 ORDER BY due_date, number"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Lists installments due in an inclusive date range.
    pub async fn list_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments \
             WHERE due_date >= ?1 AND due_date <= ?2 ORDER BY due_date, number"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Lists installments not yet fully paid (sweep input).
    pub async fn list_unpaid(&self) -> DbResult<Vec<Installment>> {
        let installments = sqlx::query_as::<_, Installment>(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM installments \
             WHERE status != 'paid' ORDER BY due_date, number"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Counts installments of an order that have any payment registered.
    ///
    /// Used to refuse schedule regeneration once collections started.
    pub async fn count_with_payments(&self, order_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM installments \
             WHERE order_id = ?1 AND (paid_amount_cents > 0 OR payment_date IS NOT NULL)",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Replaces an order's schedule wholesale.
    ///
    /// ## Atomicity
    /// Delete of the old set and insert of the new set share ONE
    /// transaction: either the complete new schedule exists, or the old
    /// one is untouched. Never a partial set.
    pub async fn replace_schedule(
        &self,
        order_id: &str,
        installments: &[Installment],
    ) -> DbResult<()> {
        debug!(order_id = %order_id, count = installments.len(), "Replacing installment schedule");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM installments WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        for installment in installments {
            sqlx::query(
                r#"
                INSERT INTO installments (
                    id, order_id, number, amount_cents, due_date, days_due,
                    status, paid_amount_cents, payment_date, notes, version,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&installment.id)
            .bind(&installment.order_id)
            .bind(installment.number)
            .bind(installment.amount_cents)
            .bind(installment.due_date)
            .bind(installment.days_due)
            .bind(installment.status)
            .bind(installment.paid_amount_cents)
            .bind(installment.payment_date)
            .bind(&installment.notes)
            .bind(installment.version)
            .bind(installment.created_at)
            .bind(installment.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Persists a payment registration with an optimistic version check.
    ///
    /// ## Concurrency
    /// `WHERE version = ?` serializes concurrent registrations on the same
    /// installment: the loser of a race sees `DbError::Conflict` and must
    /// re-fetch and retry. The paid amount OVERWRITES the stored value
    /// (cumulative single field, no incremental ledger).
    #[allow(clippy::too_many_arguments)]
    pub async fn register_payment(
        &self,
        id: &str,
        paid_amount_cents: i64,
        payment_date: Option<NaiveDate>,
        notes: Option<&str>,
        status: InstallmentStatus,
        expected_version: i64,
    ) -> DbResult<()> {
        debug!(id = %id, paid_amount_cents, "Registering installment payment");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE installments SET
                paid_amount_cents = ?2,
                payment_date = ?3,
                notes = ?4,
                status = ?5,
                version = version + 1,
                updated_at = ?6
            WHERE id = ?1 AND version = ?7
            "#,
        )
        .bind(id)
        .bind(paid_amount_cents)
        .bind(payment_date)
        .bind(notes)
        .bind(status)
        .bind(now)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a stale version from a missing row
            return match self.get_by_id(id).await? {
                Some(_) => Err(DbError::conflict("Installment", id)),
                None => Err(DbError::not_found("Installment", id)),
            };
        }

        Ok(())
    }

    /// Moves an installment from one derived status to another (sweep write).
    ///
    /// ## Idempotence
    /// Guarded by the stored status: if another sweep already applied the
    /// transition, zero rows match and the call reports `false`. Each row
    /// update is independent, so two concurrent sweeps never corrupt state.
    pub async fn transition_status(
        &self,
        id: &str,
        from: InstallmentStatus,
        to: InstallmentStatus,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE installments SET
                status = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the free-editable days_due metadata on one installment.
    pub async fn set_days_due(&self, id: &str, days_due: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE installments SET days_due = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(days_due)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Installment", id));
        }

        Ok(())
    }
}

/// Generates a new installment ID.
pub fn generate_installment_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::order::{generate_log_id, generate_order_id};
    use meridian_core::{Order, OrderStatus, OrderStatusLog};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_order(db: &Database) -> String {
        let now = Utc::now();
        let order = Order {
            id: generate_order_id(),
            client_id: Uuid::new_v4().to_string(),
            salesperson_id: Uuid::new_v4().to_string(),
            status: OrderStatus::Draft,
            subtotal_cents: 84_746,
            tax_cents: 15_254,
            total_cents: 100_000,
            payment_type: None,
            credit_type: None,
            installment_count: None,
            observations: None,
            created_at: now,
            updated_at: now,
        };
        let log = OrderStatusLog {
            id: generate_log_id(),
            order_id: order.id.clone(),
            status: OrderStatus::Draft,
            observation: None,
            has_observation: false,
            actor_id: "actor-1".to_string(),
            created_at: now,
        };
        db.orders().insert(&order, &log).await.unwrap();
        order.id
    }

    fn installment(order_id: &str, number: i64, amount_cents: i64, due: NaiveDate) -> Installment {
        let now = Utc::now();
        Installment {
            id: generate_installment_id(),
            order_id: order_id.to_string(),
            number,
            amount_cents,
            due_date: due,
            days_due: (number - 1) * 30,
            status: InstallmentStatus::Pending,
            paid_amount_cents: 0,
            payment_date: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_replace_schedule_roundtrip() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![
            installment(&order_id, 1, 33_333, date(2026, 2, 1)),
            installment(&order_id, 2, 33_333, date(2026, 3, 3)),
            installment(&order_id, 3, 33_334, date(2026, 4, 2)),
        ];
        repo.replace_schedule(&order_id, &set).await.unwrap();

        let stored = repo.get_by_order(&order_id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored.iter().map(|i| i.amount_cents).sum::<i64>(), 100_000);
        assert_eq!(stored[2].number, 3);
        assert_eq!(stored[2].due_date, date(2026, 4, 2));
    }

    #[tokio::test]
    async fn test_replace_schedule_discards_old_set() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let first = vec![
            installment(&order_id, 1, 50_000, date(2026, 2, 1)),
            installment(&order_id, 2, 50_000, date(2026, 3, 3)),
        ];
        repo.replace_schedule(&order_id, &first).await.unwrap();

        let second = vec![
            installment(&order_id, 1, 25_000, date(2026, 2, 1)),
            installment(&order_id, 2, 25_000, date(2026, 3, 3)),
            installment(&order_id, 3, 25_000, date(2026, 4, 2)),
            installment(&order_id, 4, 25_000, date(2026, 5, 2)),
        ];
        repo.replace_schedule(&order_id, &second).await.unwrap();

        let stored = repo.get_by_order(&order_id).await.unwrap();
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|i| i.amount_cents == 25_000));
    }

    #[tokio::test]
    async fn test_register_payment_version_check() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![installment(&order_id, 1, 50_000, date(2026, 2, 1))];
        repo.replace_schedule(&order_id, &set).await.unwrap();
        let id = set[0].id.clone();

        // First write with the correct version succeeds
        repo.register_payment(
            &id,
            25_000,
            Some(date(2026, 2, 10)),
            Some("wire transfer"),
            InstallmentStatus::PartiallyPaid,
            0,
        )
        .await
        .unwrap();

        let stored = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.paid_amount_cents, 25_000);
        assert_eq!(stored.status, InstallmentStatus::PartiallyPaid);
        assert_eq!(stored.version, 1);

        // Second write with the stale version conflicts
        let err = repo
            .register_payment(&id, 50_000, Some(date(2026, 2, 11)), None, InstallmentStatus::Paid, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // Missing row reports NotFound, not Conflict
        let err = repo
            .register_payment("missing", 1, None, None, InstallmentStatus::PartiallyPaid, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transition_status_guarded() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![installment(&order_id, 1, 50_000, date(2026, 2, 1))];
        repo.replace_schedule(&order_id, &set).await.unwrap();
        let id = set[0].id.clone();

        // First transition applies
        let applied = repo
            .transition_status(&id, InstallmentStatus::Pending, InstallmentStatus::Overdue)
            .await
            .unwrap();
        assert!(applied);

        // Re-applying the same transition is a no-op (concurrent sweep case)
        let applied = repo
            .transition_status(&id, InstallmentStatus::Pending, InstallmentStatus::Overdue)
            .await
            .unwrap();
        assert!(!applied);

        let stored = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, InstallmentStatus::Overdue);
    }

    #[tokio::test]
    async fn test_count_with_payments() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![
            installment(&order_id, 1, 50_000, date(2026, 2, 1)),
            installment(&order_id, 2, 50_000, date(2026, 3, 3)),
        ];
        repo.replace_schedule(&order_id, &set).await.unwrap();
        assert_eq!(repo.count_with_payments(&order_id).await.unwrap(), 0);

        repo.register_payment(
            &set[0].id,
            10_000,
            Some(date(2026, 2, 5)),
            None,
            InstallmentStatus::PartiallyPaid,
            0,
        )
        .await
        .unwrap();
        assert_eq!(repo.count_with_payments(&order_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_queries() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![
            installment(&order_id, 1, 30_000, date(2026, 2, 1)),
            installment(&order_id, 2, 30_000, date(2026, 3, 3)),
            installment(&order_id, 3, 40_000, date(2026, 4, 2)),
        ];
        repo.replace_schedule(&order_id, &set).await.unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 3);
        assert_eq!(
            repo.list_by_status(InstallmentStatus::Pending).await.unwrap().len(),
            3
        );
        assert_eq!(repo.list_unpaid().await.unwrap().len(), 3);
        assert_eq!(
            repo.list_due_between(date(2026, 2, 1), date(2026, 3, 31))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_set_days_due_is_free_editable() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.installments();

        let set = vec![installment(&order_id, 1, 50_000, date(2026, 2, 1))];
        repo.replace_schedule(&order_id, &set).await.unwrap();

        // days_due is metadata: setting it does not move the due date
        repo.set_days_due(&set[0].id, 45).await.unwrap();
        let stored = repo.get_by_id(&set[0].id).await.unwrap().unwrap();
        assert_eq!(stored.days_due, 45);
        assert_eq!(stored.due_date, date(2026, 2, 1));
    }
}
