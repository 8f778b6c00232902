//! Test helpers shared by the engine and daemon test suites.

#![warn(clippy::all)]

mod helpers;

pub use helpers::{order_number, seed_processed_order, seed_withdrawal};
