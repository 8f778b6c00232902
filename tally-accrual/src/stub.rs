//! Stub accrual system for testing.
//!
//! Simulates oracle behavior without making real API calls. Responses are
//! scripted per order number as a FIFO; once a script runs dry the stub
//! keeps answering with the last scripted response, and unscripted numbers
//! get the configured fallback (unknown order by default).

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tally_domain::OrderNumber;

use crate::ports::{AccrualApi, AccrualError, AccrualStatus, OrderInfo};

type ScriptedResponse = Result<OrderInfo, AccrualError>;

/// Stub accrual system for testing and stub mode.
pub struct StubAccrual {
    /// Scripted responses by order number
    scripts: RwLock<HashMap<String, VecDeque<ScriptedResponse>>>,
    /// Last drained response by order number (replayed once a script is dry)
    settled: RwLock<HashMap<String, ScriptedResponse>>,
    /// Response for numbers with no script
    fallback: RwLock<ScriptedResponse>,
    /// Every queried number, in call order
    calls: RwLock<Vec<String>>,
}

impl StubAccrual {
    /// Create a stub that reports every order as unknown.
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            settled: RwLock::new(HashMap::new()),
            fallback: RwLock::new(Err(AccrualError::UnknownOrder)),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Queue the next response for a number.
    pub fn script(&self, number: &OrderNumber, response: ScriptedResponse) {
        let mut scripts = self.scripts.write().unwrap();
        scripts
            .entry(number.as_str().to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue a plain status response for a number.
    pub fn script_status(&self, number: &OrderNumber, status: AccrualStatus, accrual: Option<Decimal>) {
        self.script(
            number,
            Ok(OrderInfo {
                order: number.as_str().to_string(),
                status,
                accrual,
            }),
        );
    }

    /// Replace the response used for unscripted numbers.
    pub fn set_fallback(&self, response: ScriptedResponse) {
        *self.fallback.write().unwrap() = response;
    }

    /// Numbers queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

impl Default for StubAccrual {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccrualApi for StubAccrual {
    async fn order_info(&self, number: &OrderNumber) -> Result<OrderInfo, AccrualError> {
        self.calls.write().unwrap().push(number.as_str().to_string());

        let mut scripts = self.scripts.write().unwrap();
        if let Some(queue) = scripts.get_mut(number.as_str()) {
            if let Some(response) = queue.pop_front() {
                self.settled
                    .write()
                    .unwrap()
                    .insert(number.as_str().to_string(), response.clone());
                return response;
            }
        }
        drop(scripts);

        if let Some(last) = self.settled.read().unwrap().get(number.as_str()) {
            return last.clone();
        }

        self.fallback.read().unwrap().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn number(raw: &str) -> OrderNumber {
        OrderNumber::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_unscripted_number_is_unknown() {
        let stub = StubAccrual::new();
        let result = stub.order_info(&number("79927398713")).await;
        assert!(matches!(result, Err(AccrualError::UnknownOrder)));
    }

    #[tokio::test]
    async fn test_scripted_responses_drain_in_order() {
        let stub = StubAccrual::new();
        let n = number("79927398713");
        stub.script_status(&n, AccrualStatus::Processing, None);
        stub.script_status(&n, AccrualStatus::Processed, Some(dec!(500)));

        let first = stub.order_info(&n).await.unwrap();
        assert_eq!(first.status, AccrualStatus::Processing);

        let second = stub.order_info(&n).await.unwrap();
        assert_eq!(second.status, AccrualStatus::Processed);
        assert_eq!(second.accrual, Some(dec!(500)));
    }

    #[tokio::test]
    async fn test_drained_script_replays_last_response() {
        let stub = StubAccrual::new();
        let n = number("18");
        stub.script_status(&n, AccrualStatus::Processed, Some(dec!(10)));

        stub.order_info(&n).await.unwrap();
        let replayed = stub.order_info(&n).await.unwrap();
        assert_eq!(replayed.status, AccrualStatus::Processed);
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let stub = StubAccrual::new();
        let _ = stub.order_info(&number("18")).await;
        let _ = stub.order_info(&number("79927398713")).await;
        assert_eq!(stub.calls(), vec!["18", "79927398713"]);
    }
}
