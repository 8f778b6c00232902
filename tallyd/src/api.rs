//! Operational HTTP API for the Tally daemon.
//!
//! Provides endpoints for:
//! - Health check
//! - Status (reconciliation backlog)
//!
//! The business operations (submission, balance, withdrawal) are exposed
//! as library calls on the `Ledger`; request routing for them belongs to
//! the external request-handling subsystem.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tally_engine::Ledger;
use tally_store::{OrderRepository, Store};

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<S: Store + 'static> {
    pub ledger: Arc<Ledger<S>>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Orders still waiting on an accrual verdict
    pub pending_orders: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<S>(state: Arc<ApiState<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Reconciliation backlog size.
async fn status_handler<S>(
    State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)>
where
    S: Store + 'static,
{
    let pending = state
        .ledger
        .store()
        .orders()
        .list_pending()
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
        })?;

    Ok(Json(StatusResponse {
        pending_orders: pending.len(),
    }))
}
