//! # Domain Types
//!
//! Core domain types used throughout Meridian.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderItem     │   │   Installment   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  status         │   │  order_id (FK)  │   │  order_id (FK)  │       │
//! │  │  subtotal_cents │   │  quantity       │   │  amount_cents   │       │
//! │  │  tax_cents      │   │  unit_price     │   │  due_date       │       │
//! │  │  total_cents    │   │  subtotal_cents │   │  paid_amount    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  OrderStatus    │   │InstallmentStatus│   │ OrderStatusLog  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Draft          │   │  Pending        │   │  append-only    │       │
//! │  │  Taken          │   │  Overdue        │   │  audit trail    │       │
//! │  │  Confirmed      │   │  PartiallyPaid  │   │  per transition │       │
//! │  │  InPreparation  │   │  Paid           │   └─────────────────┘       │
//! │  │  Dispatched     │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity carries a UUID v4 `id` - immutable, used for database
//! relations. Client/salesperson/product references are UUIDs into record
//! sets owned by the surrounding application (out of scope here).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Actor & Role
// =============================================================================

/// Role of the authenticated actor issuing a mutating call.
///
/// Supplied by the identity provider alongside the actor id; governs which
/// order statuses the actor may transition to (see [`crate::workflow`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Field salesperson: may only move orders between draft and taken.
    Sales,
    /// Office manager: may set any order status.
    Manager,
    /// Administrator: may set any order status.
    Admin,
}

/// An authenticated actor, as supplied by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    /// Actor id recorded in the status log audit trail.
    pub id: String,
    /// Role used for transition gating.
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            role,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// Normal progression is draft → taken → confirmed → in_preparation →
/// dispatched, but any target different from the current status is accepted
/// as long as the actor's role allows it (operators can correct mistakes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is being assembled by the salesperson.
    Draft,
    /// Order has been taken from the client.
    Taken,
    /// Order confirmed by the office; items and schedule are frozen.
    Confirmed,
    /// Warehouse is picking the order.
    InPreparation,
    /// Order has left the warehouse. Terminal in normal flow.
    Dispatched,
}

impl OrderStatus {
    /// Whether item mutation and schedule regeneration are still allowed.
    ///
    /// Only draft and taken orders are editable; every later status freezes
    /// line items and the installment schedule.
    #[inline]
    pub const fn is_editable(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Taken)
    }

    /// All statuses in their normal progression order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Draft,
        OrderStatus::Taken,
        OrderStatus::Confirmed,
        OrderStatus::InPreparation,
        OrderStatus::Dispatched,
    ];
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

// =============================================================================
// Payment Type / Credit Type
// =============================================================================

/// How the order will be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Paid in full at confirmation. No installment schedule.
    Cash,
    /// Deferred across an installment schedule.
    Credit,
}

/// The kind of payment document issued for a credit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditType {
    /// Plain invoice per installment.
    Invoice,
    /// Bank draft (letra) per installment.
    Draft,
}

// =============================================================================
// Installment Status
// =============================================================================

/// Payment status of a single installment.
///
/// Unlike [`OrderStatus`] this is never chosen by a user - it is *derived*
/// from amounts and dates (see [`crate::receivable::derive_status`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// Nothing paid, due date not yet passed.
    Pending,
    /// Nothing paid and the due date has passed.
    Overdue,
    /// Something paid, but less than the full amount.
    PartiallyPaid,
    /// Paid in full.
    Paid,
}

impl Default for InstallmentStatus {
    fn default() -> Self {
        InstallmentStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// A wholesale order.
///
/// Monetary aggregates (subtotal/tax/total) are recomputed from the line
/// items on every item mutation - stored values are never trusted to be
/// authoritative across an item write.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Client being sold to.
    pub client_id: String,
    /// Salesperson who took the order.
    pub salesperson_id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    /// None until payment terms are set on the order.
    pub payment_type: Option<PaymentType>,
    /// Only meaningful when payment_type is credit.
    pub credit_type: Option<CreditType>,
    /// Number of installments; only meaningful when payment_type is credit.
    pub installment_count: Option<i64>,
    /// Free-text notes from the salesperson.
    pub observations: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the tax as Money.
    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether line items and the schedule may still be modified.
    #[inline]
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    /// Whether the order is sold on credit.
    #[inline]
    pub fn is_credit(&self) -> bool {
        self.payment_type == Some(PaymentType::Credit)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item on an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Units ordered. Always positive.
    pub quantity: i64,
    /// Agreed unit price in cents. Non-negative.
    pub unit_price_cents: i64,
    /// quantity × unit_price, maintained on every write.
    pub subtotal_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the item subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Installment (Payment Document)
// =============================================================================

/// One scheduled partial payment of a credit order's total.
///
/// Created atomically as a set when the schedule is generated; mutated only
/// through payment registration and the overdue sweep; never deleted
/// individually (schedules are replaced wholesale before confirmation).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Installment {
    pub id: String,
    pub order_id: String,
    /// 1-based position within the schedule. Contiguous per order.
    pub number: i64,
    pub amount_cents: i64,
    /// Calendar date the installment falls due.
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Informational day count shown on the printed document. Free-editable
    /// and deliberately NOT re-derived from the due-date arithmetic.
    pub days_due: i64,
    pub status: InstallmentStatus,
    /// Cumulative amount received. Single source of truth for payment state.
    pub paid_amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    /// Returns the installment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the cumulative paid amount as Money.
    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// Outstanding balance, clamped at zero.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.amount().remaining_after(self.paid_amount())
    }
}

// =============================================================================
// Order Status Log
// =============================================================================

/// Append-only audit record of an order status transition.
///
/// Exactly one row is written per successful transition, in the same
/// transaction as the order update. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderStatusLog {
    pub id: String,
    pub order_id: String,
    /// Status the order was moved to.
    pub status: OrderStatus,
    pub observation: Option<String>,
    /// True iff the trimmed observation text is non-empty.
    pub has_observation: bool,
    /// Actor who performed the transition.
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
