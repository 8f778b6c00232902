//! Reconciler: background synchronization with the accrual system.
//!
//! A fixed-interval driver runs one cycle at a time: scan the pending
//! orders, fan out one poll task per order, join them all, and apply
//! idempotent status updates. Rate-limit hints are absorbed as a
//! cycle-wide backoff; everything transient is retried on the next cycle
//! by virtue of the order still being pending. Because terminal states
//! are sticky in the store, an abandoned cycle leaves the ledger valid
//! and re-pollable.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tally_accrual::{AccrualApi, AccrualError, AccrualStatus, OrderInfo};
use tally_domain::{Order, OrderStatus, Points};
use tally_store::{OrderRepository, Store, StoreError, UpdateOutcome};

// =============================================================================
// Configuration
// =============================================================================

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Interval between cycles when the oracle is not rate limiting
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// Cycle Report
// =============================================================================

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Orders polled this cycle
    pub polled: usize,
    /// Status updates applied to the store
    pub applied: usize,
    /// Largest retry hint observed; the next cycle waits this long
    pub backoff: Option<Duration>,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Synchronizes pending orders with the accrual system.
pub struct Reconciler<S: Store, A: AccrualApi> {
    store: Arc<S>,
    accrual: Arc<A>,
    config: ReconcilerConfig,
    shutdown: CancellationToken,
}

impl<S, A> Reconciler<S, A>
where
    S: Store + 'static,
    A: AccrualApi + 'static,
{
    /// Create a new reconciler.
    pub fn new(
        store: Arc<S>,
        accrual: Arc<A>,
        config: ReconcilerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            accrual,
            config,
            shutdown,
        }
    }

    /// Start the reconciler in the background.
    ///
    /// Returns a JoinHandle that completes once the cancellation token
    /// fires. A cancellation mid-cycle drops the in-flight poll tasks;
    /// their results are discarded.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.config.poll_interval.as_secs(),
                "Reconciler started"
            );

            loop {
                let delay = tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    result = self.run_once() => match result {
                        Ok(report) => {
                            if report.polled > 0 {
                                debug!(
                                    polled = report.polled,
                                    applied = report.applied,
                                    backoff = ?report.backoff,
                                    "Reconciliation cycle complete"
                                );
                            }
                            report.backoff.unwrap_or(self.config.poll_interval)
                        },
                        Err(e) => {
                            error!(error = %e, "Reconciliation cycle failed");
                            self.config.poll_interval
                        },
                    },
                };

                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {},
                }
            }

            info!("Reconciler stopped");
        })
    }

    /// Run a single reconciliation cycle.
    ///
    /// A failure of one order's poll or update never aborts the rest of
    /// the cycle; only the initial pending scan can fail the cycle as a
    /// whole (and is retried on the next tick by the driver).
    pub async fn run_once(&self) -> Result<CycleReport, StoreError> {
        let pending = self.store.orders().list_pending().await?;
        let polled = pending.len();

        let mut tasks: JoinSet<(Order, Result<OrderInfo, AccrualError>)> = JoinSet::new();
        for order in pending {
            let accrual = Arc::clone(&self.accrual);
            tasks.spawn(async move {
                let result = accrual.order_info(&order.number).await;
                (order, result)
            });
        }

        let mut applied = 0;
        let mut backoff: Option<Duration> = None;

        while let Some(joined) = tasks.join_next().await {
            let (order, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Poll task failed to complete");
                    continue;
                },
            };

            match result {
                Ok(info) => {
                    if self.apply_oracle_state(&order, &info).await {
                        applied += 1;
                    }
                },
                Err(AccrualError::UnknownOrder) => {
                    // Permanent classification: the accrual system will
                    // never learn about this order.
                    if self.apply(&order, OrderStatus::Invalid, Decimal::ZERO).await {
                        applied += 1;
                    }
                },
                Err(AccrualError::RateLimited(retry_after)) => {
                    debug!(number = %order.number, ?retry_after, "Rate limited");
                    backoff = Some(match backoff {
                        Some(current) => current.max(retry_after),
                        None => retry_after,
                    });
                },
                Err(e) => {
                    warn!(number = %order.number, error = %e, "Poll failed, will retry");
                },
            }
        }

        Ok(CycleReport {
            polled,
            applied,
            backoff,
        })
    }

    /// Map an oracle response onto the local order and apply it.
    ///
    /// Returns whether an update was written.
    async fn apply_oracle_state(&self, order: &Order, info: &OrderInfo) -> bool {
        match info.status {
            AccrualStatus::Processed => {
                let accrual = info.accrual.unwrap_or(Decimal::ZERO);
                self.apply(order, OrderStatus::Processed, accrual).await
            },
            AccrualStatus::Invalid => self.apply(order, OrderStatus::Invalid, Decimal::ZERO).await,
            AccrualStatus::Registered | AccrualStatus::Processing => {
                // The oracle knows the order but has no verdict yet. Track
                // its progress without claiming a terminal result.
                if order.status == OrderStatus::Registered {
                    self.apply(order, OrderStatus::Processing, Decimal::ZERO).await
                } else {
                    false
                }
            },
        }
    }

    async fn apply(&self, order: &Order, status: OrderStatus, accrual: Decimal) -> bool {
        let accrual = match Points::new(accrual) {
            Ok(points) => points,
            Err(e) => {
                warn!(number = %order.number, error = %e, "Rejected oracle accrual");
                return false;
            },
        };

        match self
            .store
            .orders()
            .apply_update(&order.number, status, accrual)
            .await
        {
            Ok(UpdateOutcome::Applied) => {
                info!(number = %order.number, %status, accrual = %accrual, "Order updated");
                true
            },
            Ok(UpdateOutcome::AlreadyFinal) => {
                debug!(number = %order.number, "Order already final");
                false
            },
            Ok(UpdateOutcome::NotFound) => {
                warn!(number = %order.number, "Pending order vanished");
                false
            },
            Err(e) => {
                warn!(number = %order.number, error = %e, "Failed to apply update");
                false
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_accrual::StubAccrual;
    use tally_domain::OrderNumber;
    use tally_store::{MemoryStore, OrderRepository};
    use uuid::Uuid;

    fn number(raw: &str) -> OrderNumber {
        OrderNumber::parse(raw).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        accrual: Arc<StubAccrual>,
        reconciler: Reconciler<MemoryStore, StubAccrual>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let accrual = Arc::new(StubAccrual::new());
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&accrual),
            ReconcilerConfig::default(),
            CancellationToken::new(),
        );
        Fixture {
            store,
            accrual,
            reconciler,
        }
    }

    async fn seed_order(store: &MemoryStore, raw: &str) -> OrderNumber {
        let order = Order::new(number(raw), Uuid::now_v7());
        store.create(&order).await.unwrap();
        order.number
    }

    #[tokio::test]
    async fn test_empty_ledger_cycles_cleanly() {
        let fx = fixture();
        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(
            report,
            CycleReport {
                polled: 0,
                applied: 0,
                backoff: None
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_order_becomes_invalid_and_stays() {
        let fx = fixture();
        let n = seed_order(&fx.store, "79927398713").await;
        // StubAccrual answers UnknownOrder by default

        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.applied, 1);

        let order = fx.store.find_by_number(&n).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Invalid);
        assert!(order.accrual.is_zero());

        // Terminal orders drop out of the pending scan entirely
        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.polled, 0);
    }

    #[tokio::test]
    async fn test_processed_order_records_accrual() {
        let fx = fixture();
        let n = seed_order(&fx.store, "79927398713").await;
        fx.accrual
            .script_status(&n, AccrualStatus::Processed, Some(dec!(729.98)));

        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.applied, 1);

        let order = fx.store.find_by_number(&n).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual.as_decimal(), dec!(729.98));
    }

    #[tokio::test]
    async fn test_oracle_acknowledgement_moves_to_processing() {
        let fx = fixture();
        let n = seed_order(&fx.store, "79927398713").await;
        fx.accrual.script_status(&n, AccrualStatus::Registered, None);

        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.applied, 1);

        let order = fx.store.find_by_number(&n).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);

        // Still processing upstream: nothing new to write
        fx.accrual.script_status(&n, AccrualStatus::Processing, None);
        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.polled, 1);
        assert_eq!(report.applied, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_sets_cycle_backoff_without_mutation() {
        let fx = fixture();
        let fast = seed_order(&fx.store, "79927398713").await;
        let slow = seed_order(&fx.store, "4561261212345467").await;

        fx.accrual
            .script(&fast, Err(AccrualError::RateLimited(Duration::from_secs(30))));
        fx.accrual
            .script(&slow, Err(AccrualError::RateLimited(Duration::from_secs(60))));

        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.backoff, Some(Duration::from_secs(60)));

        // Neither order moved
        for n in [&fast, &slow] {
            let order = fx.store.find_by_number(n).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Registered);
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_isolated_and_retried() {
        let fx = fixture();
        let flaky = seed_order(&fx.store, "79927398713").await;
        let healthy = seed_order(&fx.store, "4561261212345467").await;

        fx.accrual
            .script(&flaky, Err(AccrualError::Transport("connection reset".to_string())));
        fx.accrual
            .script_status(&healthy, AccrualStatus::Processed, Some(dec!(100)));

        // The flaky poll must not stop the healthy one from landing
        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.polled, 2);
        assert_eq!(report.applied, 1);

        let untouched = fx.store.find_by_number(&flaky).await.unwrap().unwrap();
        assert_eq!(untouched.status, OrderStatus::Registered);

        // Next cycle the flaky order recovers
        fx.accrual
            .script_status(&flaky, AccrualStatus::Processed, Some(dec!(50)));
        let report = fx.reconciler.run_once().await.unwrap();
        assert_eq!(report.applied, 1);

        let recovered = fx.store.find_by_number(&flaky).await.unwrap().unwrap();
        assert_eq!(recovered.status, OrderStatus::Processed);
        assert_eq!(recovered.accrual.as_decimal(), dec!(50));
    }

    #[tokio::test]
    async fn test_terminal_status_survives_conflicting_oracle_answer() {
        let fx = fixture();
        let n = seed_order(&fx.store, "79927398713").await;

        fx.store
            .apply_update(&n, OrderStatus::Processed, Points::new(dec!(500)).unwrap())
            .await
            .unwrap();

        // Even if the oracle were polled again with a contradicting
        // verdict, the sticky terminal state wins.
        let order = Order::new(number("79927398713"), Uuid::now_v7());
        assert!(!fx.reconciler.apply_oracle_state(
            &order,
            &OrderInfo {
                order: n.as_str().to_string(),
                status: AccrualStatus::Invalid,
                accrual: None,
            },
        )
        .await);

        let kept = fx.store.find_by_number(&n).await.unwrap().unwrap();
        assert_eq!(kept.status, OrderStatus::Processed);
        assert_eq!(kept.accrual.as_decimal(), dec!(500));
    }

    #[tokio::test]
    async fn test_start_stops_on_cancellation() {
        let store = Arc::new(MemoryStore::new());
        let accrual = Arc::new(StubAccrual::new());
        let shutdown = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&store),
            accrual,
            ReconcilerConfig {
                poll_interval: Duration::from_millis(10),
            },
            shutdown.clone(),
        ));

        let handle = reconciler.start();
        shutdown.cancel();
        handle.await.unwrap();
    }
}
