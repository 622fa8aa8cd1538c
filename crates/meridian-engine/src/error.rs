//! # Engine Error Types
//!
//! Errors surfaced to service callers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (business rules)   DbError (storage)                        │
//! │       │                            │                                    │
//! │       └──────────┬─────────────────┘                                    │
//! │                  ▼                                                      │
//! │  EngineError (this module) ← One taxonomy for callers                  │
//! │                  │                                                      │
//! │                  ▼                                                      │
//! │  Presentation layer maps variants to user-facing messages              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `DbError::Conflict` is promoted to its own variant so callers can
//! implement the re-fetch-and-retry protocol without string matching.

use thiserror::Error;

use meridian_core::CoreError;
use meridian_db::DbError;

/// Errors returned by the order and receivables services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Order id did not resolve to a stored order.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order item id did not resolve to a stored item.
    #[error("Order item not found: {0}")]
    ItemNotFound(String),

    /// Installment id did not resolve to a stored installment.
    #[error("Installment not found: {0}")]
    InstallmentNotFound(String),

    /// The write raced with another and lost the optimistic version check.
    /// Re-fetch the installment and retry with current data.
    #[error("Installment {0} was modified concurrently, re-fetch and retry")]
    ConcurrentModification(String),

    /// Business rule violation from meridian-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure. Repositories verify no partial writes occurred
    /// (transactions) before this propagates.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict { id, .. } => EngineError::ConcurrentModification(id),
            other => EngineError::Storage(other),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
