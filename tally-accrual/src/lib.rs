//! Accrual System Client
//!
//! The accrual system is the external oracle that decides whether an order
//! earns points. This crate defines the consumed contract (`AccrualApi`),
//! the REST client that implements it, and a scriptable stub used by tests
//! and the daemon's stub mode.
//!
//! The contract the reconciler relies on:
//! - an unknown order is a permanent classification, not a failure
//! - a rate-limit response carries a retry hint and applies to the whole
//!   polling cycle, not just one order
//! - everything else transient is safe to retry on the next cycle

#![warn(clippy::all)]

mod ports;
mod rest;
mod stub;

pub use ports::{AccrualApi, AccrualError, AccrualStatus, OrderInfo};
pub use rest::AccrualRestClient;
pub use stub::StubAccrual;
