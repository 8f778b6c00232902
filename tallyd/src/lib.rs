//! Tally Daemon Library
//!
//! Runtime orchestrator for the loyalty-points ledger.
//!
//! # Architecture
//!
//! ```text
//! Request handlers (external) → Ledger → Store
//!                                  ↑
//!                             Reconciler ← Accrual system
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Config**: Environment-based configuration
//! - **API**: Operational HTTP endpoints (health, status)

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use config::{ApiConfig, Config, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
