//! Domain Entities for Tally
//!
//! Orders submitted for accrual and withdrawals debited against a balance.
//! Orders are created once, advanced only by the reconciliation engine,
//! and never deleted. Withdrawals are append-only.

use crate::value_objects::{OrderNumber, Points};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an Account (owner key supplied by the identity
/// subsystem; opaque to this crate)
pub type AccountId = Uuid;

/// Unique identifier for a Withdrawal row
pub type WithdrawalId = Uuid;

// =============================================================================
// Order Status
// =============================================================================

/// Order accrual lifecycle.
///
/// Transitions: `Registered → Processing → {Invalid | Processed}`, or
/// `Registered` directly to a terminal state. Terminal states are sticky:
/// once an order is `Invalid` or `Processed` no further mutation of status
/// or accrual is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted locally, not yet acknowledged by the accrual system
    Registered,
    /// Acknowledged by the accrual system, result pending
    Processing,
    /// Accrual system rejected the order; no points will be awarded
    Invalid,
    /// Accrual computed; points awarded
    Processed,
}

impl OrderStatus {
    /// Whether this status permits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    /// Lowercase database encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Registered => "registered",
            OrderStatus::Processing => "processing",
            OrderStatus::Invalid => "invalid",
            OrderStatus::Processed => "processed",
        }
    }

    /// Parse the lowercase database encoding.
    pub fn from_str_encoded(value: &str) -> Option<Self> {
        match value {
            "registered" => Some(OrderStatus::Registered),
            "processing" => Some(OrderStatus::Processing),
            "invalid" => Some(OrderStatus::Invalid),
            "processed" => Some(OrderStatus::Processed),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// Order represents a purchase submitted for point accrual.
///
/// The number is globally unique across all accounts; the owner is fixed
/// at acceptance. Accrual is zero unless the status is `Processed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    pub account_id: AccountId,
    pub status: OrderStatus,
    pub accrual: Points,
    pub uploaded_at: DateTime<Utc>,
}

impl Order {
    /// Create a freshly accepted order in `Registered` status.
    pub fn new(number: OrderNumber, account_id: AccountId) -> Self {
        Self {
            number,
            account_id,
            status: OrderStatus::Registered,
            accrual: Points::zero(),
            uploaded_at: Utc::now(),
        }
    }

    /// Whether the reconciler still needs to poll this order.
    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }
}

// =============================================================================
// Withdrawal
// =============================================================================

/// Withdrawal is a committed debit against an account's balance.
///
/// `order_ref` is a syntactically valid order number supplied by the
/// withdrawing client; it is not required to exist in the order ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub account_id: AccountId,
    pub order_ref: OrderNumber,
    pub sum: Points,
    pub processed_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Create a withdrawal stamped with the commit time.
    pub fn new(account_id: AccountId, order_ref: OrderNumber, sum: Points) -> Self {
        Self {
            id: Uuid::now_v7(),
            account_id,
            order_ref,
            sum,
            processed_at: Utc::now(),
        }
    }
}

// =============================================================================
// Balance
// =============================================================================

/// Balance is derived from an account's orders and withdrawals; it has no
/// persisted representation to go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Spendable points: processed accruals minus withdrawals
    pub current: rust_decimal::Decimal,
    /// Lifetime withdrawn total
    pub withdrawn: rust_decimal::Decimal,
}

impl Balance {
    /// Compute a balance from order and withdrawal snapshots.
    ///
    /// Only `Processed` orders contribute accrual.
    pub fn compute(orders: &[Order], withdrawals: &[Withdrawal]) -> Self {
        let mut current = rust_decimal::Decimal::ZERO;
        let mut withdrawn = rust_decimal::Decimal::ZERO;
        for order in orders {
            if order.status == OrderStatus::Processed {
                current += order.accrual.as_decimal();
            }
        }
        for withdrawal in withdrawals {
            current -= withdrawal.sum.as_decimal();
            withdrawn += withdrawal.sum.as_decimal();
        }
        Self { current, withdrawn }
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

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Registered.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
    }

    #[test]
    fn test_status_encoding_round_trip() {
        for status in [
            OrderStatus::Registered,
            OrderStatus::Processing,
            OrderStatus::Invalid,
            OrderStatus::Processed,
        ] {
            assert_eq!(OrderStatus::from_str_encoded(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_str_encoded("NEW"), None);
    }

    #[test]
    fn test_new_order_is_registered_with_zero_accrual() {
        let order = Order::new(number("79927398713"), Uuid::now_v7());
        assert_eq!(order.status, OrderStatus::Registered);
        assert!(order.accrual.is_zero());
        assert!(order.is_pending());
    }

    #[test]
    fn test_balance_only_counts_processed_orders() {
        let account_id = Uuid::now_v7();
        let mut processed = Order::new(number("79927398713"), account_id);
        processed.status = OrderStatus::Processed;
        processed.accrual = Points::new(dec!(500)).unwrap();

        let mut still_processing = Order::new(number("4561261212345467"), account_id);
        still_processing.status = OrderStatus::Processing;

        let withdrawal = Withdrawal::new(
            account_id,
            number("18"),
            Points::new(dec!(200)).unwrap(),
        );

        let balance = Balance::compute(&[processed, still_processing], &[withdrawal]);
        assert_eq!(balance.current, dec!(300));
        assert_eq!(balance.withdrawn, dec!(200));
    }

    #[test]
    fn test_balance_empty_is_zero() {
        let balance = Balance::compute(&[], &[]);
        assert_eq!(balance.current, dec!(0));
        assert_eq!(balance.withdrawn, dec!(0));
    }
}
