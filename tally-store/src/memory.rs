//! In-memory store implementation
//!
//! Used for testing and stub mode without a database.
//! Thread-safe using RwLock for concurrent access; the single write lock
//! makes create's check-and-insert one critical section.

use crate::error::StoreError;
use crate::repository::{
    CreateOutcome, OrderRepository, Store, UpdateOutcome, WithdrawalRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tally_domain::{AccountId, Order, OrderNumber, OrderStatus, Points, Withdrawal};

/// In-memory store for testing and stub mode
pub struct MemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    withdrawals: RwLock<Vec<Withdrawal>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            withdrawals: RwLock::new(Vec::new()),
        }
    }

    /// Get the number of orders
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Get the number of withdrawals
    pub fn withdrawal_count(&self) -> usize {
        self.withdrawals.read().unwrap().len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.orders.write().unwrap().clear();
        self.withdrawals.write().unwrap().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &Order) -> Result<CreateOutcome, StoreError> {
        let mut orders = self.orders.write().unwrap();
        if let Some(existing) = orders.get(order.number.as_str()) {
            if existing.account_id == order.account_id {
                return Ok(CreateOutcome::DuplicateSameOwner);
            }
            return Ok(CreateOutcome::DuplicateOtherOwner);
        }
        orders.insert(order.number.as_str().to_string(), order.clone());
        Ok(CreateOutcome::Created)
    }

    async fn find_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(number.as_str()).cloned())
    }

    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect();
        result.sort_by_key(|o| o.uploaded_at);
        Ok(result)
    }

    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.is_pending())
            .cloned()
            .collect();
        result.sort_by_key(|o| o.uploaded_at);
        Ok(result)
    }

    async fn apply_update(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Points,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut orders = self.orders.write().unwrap();
        let Some(order) = orders.get_mut(number.as_str()) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if order.status.is_terminal() {
            return Ok(UpdateOutcome::AlreadyFinal);
        }
        order.status = status;
        order.accrual = accrual;
        Ok(UpdateOutcome::Applied)
    }
}

// =============================================================================
// Withdrawal Repository Implementation
// =============================================================================

#[async_trait]
impl WithdrawalRepository for MemoryStore {
    async fn append(&self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        let mut withdrawals = self.withdrawals.write().unwrap();
        withdrawals.push(withdrawal.clone());
        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        let withdrawals = self.withdrawals.read().unwrap();
        let mut result: Vec<Withdrawal> = withdrawals
            .iter()
            .filter(|w| w.account_id == account_id)
            .cloned()
            .collect();
        result.sort_by_key(|w| w.processed_at);
        Ok(result)
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for MemoryStore {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn withdrawals(&self) -> &dyn WithdrawalRepository {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn number(raw: &str) -> OrderNumber {
        OrderNumber::parse(raw).unwrap()
    }

    fn create_test_order(raw: &str) -> Order {
        Order::new(number(raw), Uuid::now_v7())
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryStore::new();
        let order = create_test_order("79927398713");

        let outcome = store.create(&order).await.unwrap();
        assert_eq!(outcome, CreateOutcome::Created);

        let found = store.find_by_number(&order.number).await.unwrap();
        assert_eq!(found.unwrap().account_id, order.account_id);
    }

    #[tokio::test]
    async fn test_create_duplicate_same_owner() {
        let store = MemoryStore::new();
        let order = create_test_order("79927398713");

        assert_eq!(store.create(&order).await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            store.create(&order).await.unwrap(),
            CreateOutcome::DuplicateSameOwner
        );
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_other_owner_keeps_first() {
        let store = MemoryStore::new();
        let first = create_test_order("79927398713");
        let mut second = first.clone();
        second.account_id = Uuid::now_v7();

        assert_eq!(store.create(&first).await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            store.create(&second).await.unwrap(),
            CreateOutcome::DuplicateOtherOwner
        );

        let found = store.find_by_number(&first.number).await.unwrap().unwrap();
        assert_eq!(found.account_id, first.account_id);
    }

    #[tokio::test]
    async fn test_list_for_account_ascending_by_upload_time() {
        let store = MemoryStore::new();
        let account_id = Uuid::now_v7();

        let mut early = Order::new(number("79927398713"), account_id);
        early.uploaded_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let late = Order::new(number("4561261212345467"), account_id);
        let other = create_test_order("18");

        store.create(&late).await.unwrap();
        store.create(&early).await.unwrap();
        store.create(&other).await.unwrap();

        let listed = OrderRepository::list_for_account(&store, account_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].number.as_str(), "79927398713");
        assert_eq!(listed[1].number.as_str(), "4561261212345467");
    }

    #[tokio::test]
    async fn test_list_pending_skips_terminal() {
        let store = MemoryStore::new();

        let pending = create_test_order("79927398713");
        store.create(&pending).await.unwrap();

        let done = create_test_order("4561261212345467");
        store.create(&done).await.unwrap();
        store
            .apply_update(
                &done.number,
                OrderStatus::Processed,
                Points::new(dec!(10)).unwrap(),
            )
            .await
            .unwrap();

        let listed = store.list_pending().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].number, pending.number);
    }

    #[tokio::test]
    async fn test_apply_update_advances_status() {
        let store = MemoryStore::new();
        let order = create_test_order("79927398713");
        store.create(&order).await.unwrap();

        let outcome = store
            .apply_update(&order.number, OrderStatus::Processing, Points::zero())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Applied);

        let found = store.find_by_number(&order.number).await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_apply_update_terminal_is_sticky() {
        let store = MemoryStore::new();
        let order = create_test_order("79927398713");
        store.create(&order).await.unwrap();

        let accrual = Points::new(dec!(500)).unwrap();
        assert_eq!(
            store
                .apply_update(&order.number, OrderStatus::Processed, accrual)
                .await
                .unwrap(),
            UpdateOutcome::Applied
        );

        // Same terminal status again: no-op
        assert_eq!(
            store
                .apply_update(&order.number, OrderStatus::Processed, accrual)
                .await
                .unwrap(),
            UpdateOutcome::AlreadyFinal
        );

        // Different status after terminal: still a no-op
        assert_eq!(
            store
                .apply_update(&order.number, OrderStatus::Invalid, Points::zero())
                .await
                .unwrap(),
            UpdateOutcome::AlreadyFinal
        );

        let found = store.find_by_number(&order.number).await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Processed);
        assert_eq!(found.accrual, accrual);
    }

    #[tokio::test]
    async fn test_apply_update_not_found() {
        let store = MemoryStore::new();
        let outcome = store
            .apply_update(&number("79927398713"), OrderStatus::Invalid, Points::zero())
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_withdrawals_append_and_list() {
        let store = MemoryStore::new();
        let account_id = Uuid::now_v7();

        let first = Withdrawal::new(account_id, number("79927398713"), Points::new(dec!(50)).unwrap());
        let second = Withdrawal::new(account_id, number("18"), Points::new(dec!(25)).unwrap());
        let other = Withdrawal::new(Uuid::now_v7(), number("18"), Points::new(dec!(10)).unwrap());

        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();
        store.append(&other).await.unwrap();

        let listed = WithdrawalRepository::list_for_account(&store, account_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].processed_at <= listed[1].processed_at);
        assert_eq!(store.withdrawal_count(), 3);
    }
}
