//! # Order Repository
//!
//! Database operations for orders, line items, and the status log.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── insert() → Order { status: Draft } + initial log row           │
//! │                                                                         │
//! │  2. EDIT ITEMS (while draft/taken)                                     │
//! │     └── insert_item() → item write + re-SELECT + recomputed aggregates │
//! │     └── update_item() → same transaction                               │
//! │     └── delete_item() → same transaction                               │
//! │         (recomputation happens INSIDE the transaction, so concurrent   │
//! │          item writes can never leave stale aggregates behind)          │
//! │                                                                         │
//! │  3. TRANSITION                                                         │
//! │     └── change_status_with_log() → status update guarded by the        │
//! │         previous status + log append, both or neither                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use meridian_core::{
    CreditType, Order, OrderItem, OrderStatus, OrderStatusLog, OrderTotals, PaymentType,
};

const ORDER_COLUMNS: &str = "id, client_id, salesperson_id, status, subtotal_cents, tax_cents, \
     total_cents, payment_type, credit_type, installment_count, observations, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, unit_price_cents, subtotal_cents, created_at, updated_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Inserts a new order together with its initial status log row.
    ///
    /// Both writes happen in one transaction so the audit trail always
    /// starts at the order's creation.
    pub async fn insert(&self, order: &Order, initial_log: &OrderStatusLog) -> DbResult<()> {
        debug!(id = %order.id, client_id = %order.client_id, "Inserting order");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, client_id, salesperson_id, status,
                subtotal_cents, tax_cents, total_cents,
                payment_type, credit_type, installment_count,
                observations, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&order.id)
        .bind(&order.client_id)
        .bind(&order.salesperson_id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.tax_cents)
        .bind(order.total_cents)
        .bind(order.payment_type)
        .bind(order.credit_type)
        .bind(order.installment_count)
        .bind(&order.observations)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_status_log(&mut tx, initial_log).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists orders in a given status, most recent first.
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists orders for a client, most recent first.
    pub async fn list_by_client(&self, client_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE client_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists orders taken by a salesperson, most recent first.
    pub async fn list_by_salesperson(&self, salesperson_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE salesperson_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(salesperson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Sets the payment terms of an order.
    pub async fn set_payment_terms(
        &self,
        order_id: &str,
        payment_type: PaymentType,
        credit_type: Option<CreditType>,
        installment_count: Option<i64>,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_type = ?2,
                credit_type = ?3,
                installment_count = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(payment_type)
        .bind(credit_type)
        .bind(installment_count)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    /// Updates an order's status and appends the audit log row.
    ///
    /// The update is guarded by the expected previous status: when the
    /// row no longer holds `from` (another writer transitioned it first),
    /// nothing is written and `Conflict` is returned, so a race can never
    /// record a transition the state machine already rejected.
    ///
    /// ## Atomicity
    /// The status update and the log insert happen in ONE transaction -
    /// both or neither. A failed log append rolls the status back.
    pub async fn change_status_with_log(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        log: &OrderStatusLog,
    ) -> DbResult<()> {
        debug!(order_id = %order_id, from = ?from, to = ?to, "Transitioning order status");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Disambiguate: a missing row vs a lost race on the status
            let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await?;
            return if exists > 0 {
                Err(DbError::conflict("Order", order_id))
            } else {
                Err(DbError::not_found("Order", order_id))
            };
        }

        insert_status_log(&mut tx, log).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets the full status history of an order, oldest first.
    pub async fn get_status_logs(&self, order_id: &str) -> DbResult<Vec<OrderStatusLog>> {
        let logs = sqlx::query_as::<_, OrderStatusLog>(
            r#"
            SELECT id, order_id, status, observation, has_observation, actor_id, created_at
            FROM order_status_logs
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    // =========================================================================
    // Order items
    // =========================================================================

    /// Gets all items for an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a single item by ID.
    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<OrderItem>> {
        let item = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts an item and recomputes the order aggregates.
    ///
    /// ## Atomicity
    /// The item write, the re-SELECT of the full item set, and the totals
    /// update all share one transaction. Aggregates are recomputed from
    /// what the transaction actually sees, never from a caller snapshot,
    /// so concurrent item writes cannot leave stale aggregates behind.
    pub async fn insert_item(&self, item: &OrderItem) -> DbResult<OrderTotals> {
        debug!(order_id = %item.order_id, product_id = %item.product_id, "Adding order item");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, quantity,
                unit_price_cents, subtotal_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await?;

        let totals = recompute_totals(&mut tx, &item.order_id).await?;

        tx.commit().await?;
        Ok(totals)
    }

    /// Updates an item's quantity/price and recomputes the aggregates,
    /// all inside one transaction.
    pub async fn update_item(
        &self,
        item_id: &str,
        order_id: &str,
        quantity: i64,
        unit_price_cents: i64,
        subtotal_cents: i64,
    ) -> DbResult<OrderTotals> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE order_items SET
                quantity = ?2,
                unit_price_cents = ?3,
                subtotal_cents = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .bind(subtotal_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OrderItem", item_id));
        }

        let totals = recompute_totals(&mut tx, order_id).await?;

        tx.commit().await?;
        Ok(totals)
    }

    /// Deletes an item and recomputes the aggregates, all inside one
    /// transaction.
    ///
    /// This is the only destruction path for an item - no orphans remain
    /// because the totals shrink in the same transaction.
    pub async fn delete_item(&self, item_id: &str, order_id: &str) -> DbResult<OrderTotals> {
        debug!(item_id = %item_id, order_id = %order_id, "Removing order item");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM order_items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("OrderItem", item_id));
        }

        let totals = recompute_totals(&mut tx, order_id).await?;

        tx.commit().await?;
        Ok(totals)
    }
}

/// Re-reads the full item set inside the caller's transaction, recomputes
/// the aggregates, and writes them to the order row.
async fn recompute_totals(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: &str,
) -> DbResult<OrderTotals> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
    ))
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    let totals = OrderTotals::from_items(&items);
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE orders SET
            subtotal_cents = ?2,
            tax_cents = ?3,
            total_cents = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(order_id)
    .bind(totals.subtotal_cents)
    .bind(totals.tax_cents)
    .bind(totals.total_cents)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    Ok(totals)
}

/// Appends a status log row inside a caller's transaction.
async fn insert_status_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    log: &OrderStatusLog,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_status_logs (
            id, order_id, status, observation, has_observation, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&log.id)
    .bind(&log.order_id)
    .bind(log.status)
    .bind(&log.observation)
    .bind(log.has_observation)
    .bind(&log.actor_id)
    .bind(log.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new order item ID.
pub fn generate_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new status log ID.
pub fn generate_log_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
