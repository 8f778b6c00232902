//! Tally Daemon
//!
//! Loyalty-points ledger with background accrual reconciliation.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration (in-memory store)
//! cargo run -p tallyd
//!
//! # Start against a real accrual system
//! TALLY_ACCRUAL_ADDRESS=http://localhost:8081 cargo run -p tallyd
//!
//! # With PostgreSQL persistence
//! DATABASE_URL=postgres://... cargo run -p tallyd --features postgres
//! ```
//!
//! # Environment Variables
//!
//! - `TALLY_ENV`: Environment (test, development, production)
//! - `TALLY_API_HOST`: Operational API host (default: 0.0.0.0)
//! - `TALLY_API_PORT`: Operational API port (default: 8080)
//! - `TALLY_ACCRUAL_ADDRESS`: Accrual system address (default: http://localhost:8081)
//! - `TALLY_POLL_INTERVAL_SECS`: Reconciliation interval (default: 1)
//! - `DATABASE_URL`: PostgreSQL DSN (postgres feature)

use std::sync::Arc;

use tallyd::{Config, Daemon, Environment};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally_accrual::AccrualRestClient;
use tally_store::MemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tallyd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        accrual = %config.accrual_address,
        "Tally daemon"
    );

    #[cfg(feature = "postgres")]
    if let Some(database_url) = config.database_url.clone() {
        let pool = sqlx::PgPool::connect(&database_url).await?;
        tally_store::ensure_schema(&pool).await?;

        let store = Arc::new(tally_store::PgStore::new(pool));
        let accrual = Arc::new(AccrualRestClient::new(config.accrual_address.clone()));
        Daemon::new(config, store, accrual).run().await?;
        return Ok(());
    }

    if config.environment == Environment::Test {
        Daemon::new_stub(config).run().await?;
        return Ok(());
    }

    let store = Arc::new(MemoryStore::new());
    let accrual = Arc::new(AccrualRestClient::new(config.accrual_address.clone()));
    Daemon::new(config, store, accrual).run().await?;

    Ok(())
}
