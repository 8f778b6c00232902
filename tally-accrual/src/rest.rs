//! REST client for the accrual system.
//!
//! Endpoint contract:
//! - `GET {base}/api/orders/{number}`
//! - `200` with a JSON body carrying status and optional accrual
//! - `204` when the order is unknown to the accrual system
//! - `429` with a `Retry-After` header in whole seconds

use crate::ports::{AccrualApi, AccrualError, OrderInfo};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tally_domain::OrderNumber;
use tokio::time::timeout;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Backoff applied when a 429 arrives without a usable Retry-After header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client for the accrual system.
pub struct AccrualRestClient {
    /// HTTP client
    client: Client,
    /// Base URL of the accrual system (no trailing slash)
    base_url: String,
}

impl AccrualRestClient {
    /// Create a new accrual client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Accrual system address, e.g. `http://localhost:8081`
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn order_url(&self, number: &OrderNumber) -> String {
        format!("{}/api/orders/{}", self.base_url, number)
    }
}

/// Parse a `Retry-After` header value, falling back to the default when
/// the header is absent or not a whole number of seconds.
fn parse_retry_after(header: Option<&str>) -> Duration {
    header
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
}

#[async_trait]
impl AccrualApi for AccrualRestClient {
    async fn order_info(&self, number: &OrderNumber) -> Result<OrderInfo, AccrualError> {
        let url = self.order_url(number);

        let response = timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.client.get(&url).send(),
        )
        .await
        .map_err(|_| AccrualError::Timeout)?
        .map_err(|e| AccrualError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let info = response
                    .json::<OrderInfo>()
                    .await
                    .map_err(|e| AccrualError::Decode(e.to_string()))?;
                Ok(info)
            },
            StatusCode::NO_CONTENT => Err(AccrualError::UnknownOrder),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(
                    response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                Err(AccrualError::RateLimited(retry_after))
            },
            other => Err(AccrualError::UnexpectedStatus(other.as_u16())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_url_joins_base_and_number() {
        let client = AccrualRestClient::new("http://localhost:8081");
        let number = OrderNumber::parse("79927398713").unwrap();
        assert_eq!(
            client.order_url(&number),
            "http://localhost:8081/api/orders/79927398713"
        );
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let client = AccrualRestClient::new("http://localhost:8081/");
        let number = OrderNumber::parse("18").unwrap();
        assert_eq!(
            client.order_url(&number),
            "http://localhost:8081/api/orders/18"
        );
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after(Some("30")), Duration::from_secs(30));
        assert_eq!(parse_retry_after(Some(" 5 ")), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_retry_after_falls_back_on_garbage() {
        let default = Duration::from_secs(DEFAULT_RETRY_AFTER_SECS);
        assert_eq!(parse_retry_after(None), default);
        assert_eq!(parse_retry_after(Some("soon")), default);
        assert_eq!(parse_retry_after(Some("-2")), default);
    }
}
