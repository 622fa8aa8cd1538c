//! # meridian-db: Database Layer for Meridian
//!
//! This crate provides database access for the Meridian order and
//! receivables system. It uses SQLite for storage with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Meridian Data Flow                               │
//! │                                                                         │
//! │  Service call (register_payment, change_status, ...)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    meridian-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (order.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │  installment) │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_init.sql │  │   │
//! │  │   │ WAL + FKs     │    │ InstallmentRp │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (or :memory: in tests)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Guarantees
//! - Multi-row invariants (item + totals, status + log, schedule sets) are
//!   enforced with single transactions inside repositories
//! - Payment registration uses optimistic versioning; losers of a race get
//!   [`DbError::Conflict`] and must re-fetch
//! - Sweep writes are guarded by the stored status, so re-running a sweep
//!   (or running two concurrently) is harmless

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::installment::InstallmentRepository;
pub use repository::order::OrderRepository;
