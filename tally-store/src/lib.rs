//! Tally Storage Layer
//!
//! Provides persistence for orders and withdrawals.
//!
//! # Architecture
//!
//! - **Repository traits**: Define the storage interface (ports)
//! - **In-memory store**: Fast implementation for testing and stub mode
//! - **PostgreSQL store**: Production implementation (feature `postgres`)
//!
//! The repositories own all atomicity the ledger relies on: order creation
//! is insert-or-detect-conflict in one critical section, and status updates
//! refuse to touch terminal rows.

#![warn(clippy::all)]

mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{ensure_schema, PgStore};
pub use repository::{
    CreateOutcome, OrderRepository, Store, UpdateOutcome, WithdrawalRepository,
};
