//! # Meridian Engine
//!
//! Service layer tying the pure domain rules in `meridian-core` to the
//! SQLite persistence in `meridian-db`.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           meridian-engine                               │
//! │                                                                         │
//! │   ┌──────────────────┐              ┌──────────────────────┐           │
//! │   │   OrderService   │              │  ReceivablesService  │           │
//! │   │                  │              │                      │           │
//! │   │  create / items  │              │  register_payment    │           │
//! │   │  status changes  │              │  overdue sweep       │           │
//! │   │  schedule gen    │              │  summary / queries   │           │
//! │   └────────┬─────────┘              └──────────┬───────────┘           │
//! │            │                                   │                       │
//! │            │  validation & derivation:         │                       │
//! │            │  meridian-core (pure, no I/O)     │                       │
//! │            │                                   │                       │
//! │            └───────────┬───────────────────────┘                       │
//! │                        ▼                                               │
//! │              meridian-db (sqlx / SQLite)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Services are thin: each operation loads state, applies a core rule, and
//! persists through a repository method that keeps multi-row invariants in
//! one transaction. Anything that can fail returns [`EngineError`].

pub mod error;
pub mod order_service;
pub mod receivables_service;

pub use error::{EngineError, EngineResult};
pub use order_service::OrderService;
pub use receivables_service::ReceivablesService;
