//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Ledger (account-facing operations)
//! - Reconciler (background accrual synchronization)
//! - Operational API (health, status)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Initialize store, accrual client, ledger, reconciler
//! 3. Start operational API server
//! 4. Start the reconciler loop
//! 5. Graceful shutdown on SIGINT: cancel the token, await the loop

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tally_accrual::{AccrualApi, StubAccrual};
use tally_engine::{Ledger, Reconciler, ReconcilerConfig};
use tally_store::{MemoryStore, Store};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main Tally daemon.
pub struct Daemon<S: Store + 'static, A: AccrualApi + 'static> {
    /// Configuration
    config: Config,
    /// Ledger over the shared store
    ledger: Arc<Ledger<S>>,
    /// Background reconciler
    reconciler: Arc<Reconciler<S, A>>,
    /// Shutdown token
    shutdown: CancellationToken,
}

impl Daemon<MemoryStore, StubAccrual> {
    /// Create a new daemon with stub components (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let accrual = Arc::new(StubAccrual::new());
        Self::new(config, store, accrual)
    }
}

impl<S: Store + 'static, A: AccrualApi + 'static> Daemon<S, A> {
    /// Create a new daemon with provided components.
    pub fn new(config: Config, store: Arc<S>, accrual: Arc<A>) -> Self {
        let shutdown = CancellationToken::new();
        let ledger = Arc::new(Ledger::new(Arc::clone(&store)));
        let reconciler = Arc::new(Reconciler::new(
            store,
            accrual,
            ReconcilerConfig {
                poll_interval: config.poll_interval,
            },
            shutdown.clone(),
        ));

        Self {
            config,
            ledger,
            reconciler,
            shutdown,
        }
    }

    /// Access the ledger (the surface the request-handling subsystem calls).
    pub fn ledger(&self) -> &Arc<Ledger<S>> {
        &self.ledger
    }

    /// Clone the shutdown token (for external cancellation).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the daemon.
    ///
    /// Blocks until shutdown is requested (SIGINT or a cancelled token).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            accrual = %self.config.accrual_address,
            "Starting Tally daemon"
        );

        // 1. Operational API
        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        // 2. Background reconciliation
        let reconciler_handle = Arc::clone(&self.reconciler).start();

        // 3. Wait for shutdown
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown token cancelled");
            }
        }

        // 4. Graceful shutdown: stop the reconciler and wait for it
        self.shutdown.cancel();
        if reconciler_handle.await.is_err() {
            error!("Reconciler task panicked during shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the operational API server.
    async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            ledger: Arc::clone(&self.ledger),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Failed to get local address: {}", e)))?;

        // Spawn the server task
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server error");
            }
        });

        Ok(local_addr)
    }
}

// =============================================================================
// Tests
// =============================================================================
