//! Tally Domain Layer
//!
//! Core types for the loyalty-points ledger:
//!
//! - **Value objects**: validated primitives (`OrderNumber`, `Points`)
//! - **Entities**: `Order` with its status lifecycle, `Withdrawal`
//! - **Derived values**: `Balance` (never persisted, always recomputed)

#![warn(clippy::all)]

mod entities;
mod value_objects;

pub use entities::{AccountId, Balance, Order, OrderStatus, Withdrawal, WithdrawalId};
pub use value_objects::{DomainError, OrderNumber, Points};
