//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many receivables systems:                                           │
//! │    1000.00 / 3 = 333.33 (×3 = 999.99)  → Lost 0.01!                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    100000 cents / 3 = 33333 cents (×3 = 99999 cents)                   │
//! │    We KNOW we lost 1 cent, and assign it to the last installment       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1990); // 19.90
//!
//! // Arithmetic operations
//! let line = price * 3;                       // 59.70
//! let total = line + Money::from_cents(1075); // 70.45
//!
//! // NEVER do this:
//! // let bad = Money::from_float(19.90); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1800 bps = 18% (the sales tax applied to every order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

/// The fixed 18% sales tax rate applied to every order subtotal.
pub const TAX_RATE: TaxRate = TaxRate::from_bps(1800);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (remaining balances)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  OrderItem.unit_price × quantity ──► item subtotal                     │
/// │                                                                         │
/// │  Σ item subtotals ──► Order.subtotal ──► tax (18%) ──► Order.total     │
/// │                                                                         │
/// │  Order.total / N ──► Installment.amount ──► paid_amount ──► remaining  │
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// let price = Money::from_cents(1990); // Represents 19.90
    /// assert_eq!(price.cents(), 1990);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax with half-up rounding.
    ///
    /// ## Half-Up Rounding
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  HALF-UP ROUNDING                                                   │
    /// │                                                                     │
    /// │  Exactly .005 rounds away from zero:                               │
    /// │    0.824 → 0.82,  0.825 → 0.83,  0.826 → 0.83                      │
    /// │                                                                     │
    /// │  Applied ONCE on the summed subtotal, never per line item, so      │
    /// │  repeated recomputation can never drift.                           │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Implementation
    /// Integer math only: `(amount × bps + 5000) / 10000`
    /// The +5000 provides the half-up behaviour (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::{Money, TAX_RATE};
    ///
    /// let subtotal = Money::from_cents(5970); // 59.70 (3 × 19.90)
    /// let tax = subtotal.calculate_tax(TAX_RATE);
    /// // 59.70 × 18% = 10.746 → rounds to 10.75
    /// assert_eq!(tax.cents(), 1075);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // Use i128 to prevent overflow on large amounts
        // rate.bps() is basis points: 1800 = 18%
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1990); // 19.90
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 5970); // 59.70
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Saturating subtraction clamped at zero.
    ///
    /// Used for remaining-balance math where a fully paid installment
    /// must report 0.00 remaining, never a negative amount.
    #[inline]
    pub const fn remaining_after(&self, paid: Money) -> Self {
        let rem = self.0 - paid.0;
        if rem < 0 {
            Money(0)
        } else {
            Money(rem)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. The presentation layer formats currency
/// for actual display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Sum of an iterator of Money values.
impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
