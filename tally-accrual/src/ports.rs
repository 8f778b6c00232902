//! Accrual oracle port: the one operation the engine consumes, plus the
//! wire types and the failure classification the reconciler dispatches on.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tally_domain::OrderNumber;
use thiserror::Error;

/// Order status as reported by the accrual system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// Order registered, accrual not yet computed
    Registered,
    /// Accrual computation in progress
    Processing,
    /// Order rejected; no points
    Invalid,
    /// Accrual computed
    Processed,
}

impl AccrualStatus {
    /// Whether the accrual system will never change this status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AccrualStatus::Invalid | AccrualStatus::Processed)
    }
}

/// Successful accrual response for one order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderInfo {
    /// Order number, echoed back
    pub order: String,
    /// Remote status
    pub status: AccrualStatus,
    /// Awarded points; present only once processed
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

/// Classified failures of an accrual query.
#[derive(Debug, Clone, Error)]
pub enum AccrualError {
    /// The accrual system has no record of this order (permanent)
    #[error("Unknown order")]
    UnknownOrder,

    /// The accrual system asked us to back off
    #[error("Rate limited, retry after {0:?}")]
    RateLimited(Duration),

    /// The request did not complete within the deadline
    #[error("Request timed out")]
    Timeout,

    /// Transport-level failure (connect, DNS, read)
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Response status outside the documented contract
    #[error("Unexpected response status {0}")]
    UnexpectedStatus(u16),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl AccrualError {
    /// Whether the reconciler should simply retry on the next cycle.
    ///
    /// Unknown orders and rate limits get dedicated handling; everything
    /// else is transient.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AccrualError::UnknownOrder | AccrualError::RateLimited(_))
    }
}

/// The single operation the accrual system exposes.
#[async_trait]
pub trait AccrualApi: Send + Sync {
    /// Query the current accrual state of one order.
    async fn order_info(&self, number: &OrderNumber) -> Result<OrderInfo, AccrualError>;
}

// =============================================================================
// Tests
// =============================================================================
