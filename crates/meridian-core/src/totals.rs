//! # Order Totals Calculator
//!
//! Pure computation of an order's monetary aggregates from its line items.
//!
//! ## Canonical Recomputation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Totals Recomputation                                  │
//! │                                                                         │
//! │  EVERY item mutation (add / update / remove)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderTotals::from_items(&items) ← THIS MODULE                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE orders SET subtotal, tax, total  (same transaction)            │
//! │                                                                         │
//! │  Stored aggregates are NEVER trusted across an item write - they are   │
//! │  always re-derived from the items so they cannot go stale.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Subtotals are exact (integer cents × integer quantity). The 18% tax is
//! rounded half-up ONCE on the summed subtotal, never per line item.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, TAX_RATE};
use crate::types::OrderItem;

/// The three monetary aggregates of an order.
///
/// Invariant: `total == subtotal + tax` and `tax == half_up(subtotal × 18%)`.
/// Both hold by construction - there is no way to build an `OrderTotals`
/// that violates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl OrderTotals {
    /// Computes totals from a set of line items.
    ///
    /// Pure and deterministic: identical items always produce identical
    /// totals, with no floating-point drift across repeated calls.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use meridian_core::totals::OrderTotals;
    /// use meridian_core::types::OrderItem;
    ///
    /// let item = OrderItem {
    ///     id: "i".into(),
    ///     order_id: "o".into(),
    ///     product_id: "p".into(),
    ///     quantity: 3,
    ///     unit_price_cents: 1990,
    ///     subtotal_cents: 5970,
    ///     created_at: Utc::now(),
    ///     updated_at: Utc::now(),
    /// };
    /// let totals = OrderTotals::from_items(&[item]);
    /// assert_eq!(totals.subtotal_cents, 5970); // 59.70
    /// assert_eq!(totals.tax_cents, 1075);      // 10.75
    /// assert_eq!(totals.total_cents, 7045);    // 70.45
    /// ```
    pub fn from_items(items: &[OrderItem]) -> Self {
        // Line subtotals are recomputed from quantity × unit price here,
        // not read from the stored subtotal_cents column.
        let subtotal: Money = items
            .iter()
            .map(|item| item.unit_price().multiply_quantity(item.quantity))
            .sum();

        Self::from_subtotal(subtotal)
    }

    /// Computes tax and total from a known subtotal.
    pub fn from_subtotal(subtotal: Money) -> Self {
        let tax = subtotal.calculate_tax(TAX_RATE);
        let total = subtotal + tax;

        OrderTotals {
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
        }
    }

    /// Totals of an order with no items.
    pub const fn empty() -> Self {
        OrderTotals {
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }

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
}

impl Default for OrderTotals {
    fn default() -> Self {
        OrderTotals::empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
