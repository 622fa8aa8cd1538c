//! # Repository Module
//!
//! Database repository implementations for Meridian.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service call                                                          │
//! │       │                                                                 │
//! │       │  db.orders().get_by_id(&id)                                    │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, order)                                              │
//! │  ├── insert_item(&self, item)                                          │
//! │  └── change_status_with_log(&self, ...)                                │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Multi-row invariants (item + totals, status + log) live in          │
//! │    single transactions here, not scattered through callers             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`order::OrderRepository`] - Orders, line items, status log
//! - [`installment::InstallmentRepository`] - Installment schedules and payments

pub mod installment;
pub mod order;
