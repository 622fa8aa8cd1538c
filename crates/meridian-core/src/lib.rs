//! # meridian-core: Pure Business Logic for Meridian
//!
//! This crate is the **heart** of Meridian, an order-management system for a
//! wholesale distributor. It contains all business logic as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Meridian Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation Layer (external)                  │   │
//! │  │    Order list ──► Order detail ──► Receivables ──► Reports     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    meridian-engine                              │   │
//! │  │    OrderService, ReceivablesService (injected Database)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ meridian-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │  totals   │  │ schedule  │  │ workflow  │  │   │
//! │  │   │   Money   │  │ subtotal  │  │ split N   │  │ status    │  │   │
//! │  │   │  TaxRate  │  │ tax/total │  │ due dates │  │ machine   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │receivable │  │   stats   │  │ validation│                 │   │
//! │  │   │ derive    │  │ portfolio │  │   rules   │                 │   │
//! │  │   │ status    │  │ summary   │  │   checks  │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    meridian-db (Database Layer)                 │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderItem, Installment, OrderStatusLog)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`totals`] - Order subtotal/tax/total calculator
//! - [`schedule`] - Installment schedule generation for credit orders
//! - [`workflow`] - Order status state machine with role-gated targets
//! - [`receivable`] - Installment payment status derivation
//! - [`stats`] - Receivables portfolio aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **No Clock**: "today" is always a parameter, never read from the system
//! 4. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 5. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//! use meridian_core::money::TAX_RATE;
//!
//! // Create money from cents (never from floats!)
//! let subtotal = Money::from_cents(5970); // 59.70
//!
//! // Sales tax at the fixed 18% rate, half-up rounding
//! let tax = subtotal.calculate_tax(TAX_RATE);
//! assert_eq!(tax.cents(), 1075); // 10.75
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod receivable;
pub mod schedule;
pub mod stats;
pub mod totals;
pub mod types;
pub mod validation;
pub mod workflow;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::{Money, TaxRate, TAX_RATE};
pub use receivable::{derive_status, refreshed_status};
pub use schedule::{generate_schedule, ScheduledInstallment};
pub use stats::ReceivablesSummary;
pub use totals::OrderTotals;
pub use types::*;
pub use workflow::{allowed_targets, validate_transition};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of installments a credit order may be split into.
///
/// ## Business Reason
/// The distributor never extends terms beyond 24 monthly installments.
/// Schedule generation rejects anything above it.
pub const MAX_INSTALLMENTS: u32 = 24;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 100).
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Default gap between consecutive installment due dates, in calendar days.
pub const DEFAULT_INSTALLMENT_INTERVAL_DAYS: i64 = 30;

/// Maximum length of free-text observations (order notes, status log notes).
pub const MAX_OBSERVATION_LEN: usize = 500;
