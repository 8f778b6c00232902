//! Tally Engine
//!
//! The core of the loyalty-points ledger:
//!
//! - **Ledger**: order submission, listing, balance recomputation, and the
//!   withdrawal guard that makes overdrafts impossible under concurrency
//! - **Reconciler**: the background cycle that keeps local order state in
//!   sync with the accrual system
//!
//! All durable state lives behind the `tally-store` ports; the engine owns
//! only the per-account admission locks and the reconciliation loop state.

#![warn(clippy::all)]

mod error;
mod ledger;
mod reconciler;

pub use error::LedgerError;
pub use ledger::{Ledger, SubmitOutcome};
pub use reconciler::{CycleReport, Reconciler, ReconcilerConfig};
