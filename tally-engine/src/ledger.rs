//! Ledger: the account-facing operations.
//!
//! Submission, listing, balance computation and withdrawal admission.
//! Balances are recomputed from the store on every read; there is no
//! cached balance to go stale. Withdrawal admission runs the balance read
//! and the append inside one per-account critical section, so two
//! concurrent withdrawals for the same account observe each other
//! serially and can never jointly overdraw.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use tally_domain::{AccountId, Balance, Order, OrderNumber, Points, Withdrawal};
use tally_store::{CreateOutcome, OrderRepository, Store, WithdrawalRepository};

use crate::error::LedgerError;

/// Outcome of an order submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The order was accepted and registered for accrual
    Accepted,
    /// The same account already submitted this number; nothing changed
    AlreadyAccepted,
}

/// Account-facing ledger operations over a store.
pub struct Ledger<S: Store> {
    store: Arc<S>,
    /// Per-account withdrawal admission locks. The registry itself is
    /// locked only long enough to fetch or create an entry; the entry
    /// lock is held across the balance read + append.
    account_locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl<S: Store> Ledger<S> {
    /// Create a ledger over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Submit an order number for accrual.
    ///
    /// Validates the checksum first (cheap, local), then inserts the order
    /// as `Registered`. Resubmission by the same account is an idempotent
    /// success; the same number from a different account is a conflict.
    pub async fn submit_order(
        &self,
        account_id: AccountId,
        raw_number: &str,
    ) -> Result<SubmitOutcome, LedgerError> {
        let number = OrderNumber::parse(raw_number)?;
        let order = Order::new(number, account_id);

        match self.store.orders().create(&order).await? {
            CreateOutcome::Created => {
                info!(number = %order.number, %account_id, "Order registered");
                Ok(SubmitOutcome::Accepted)
            },
            CreateOutcome::DuplicateSameOwner => {
                debug!(number = %order.number, %account_id, "Order already registered");
                Ok(SubmitOutcome::AlreadyAccepted)
            },
            CreateOutcome::DuplicateOtherOwner => Err(LedgerError::OrderOwnedByOther),
        }
    }

    /// All orders of an account, ascending by upload time.
    pub async fn orders(&self, account_id: AccountId) -> Result<Vec<Order>, LedgerError> {
        Ok(self.store.orders().list_for_account(account_id).await?)
    }

    /// Current balance of an account.
    ///
    /// Recomputed from the order and withdrawal snapshots visible at read
    /// time; worst case it is stale by one reconciliation interval.
    pub async fn balance(&self, account_id: AccountId) -> Result<Balance, LedgerError> {
        let orders = self.store.orders().list_for_account(account_id).await?;
        let withdrawals = self
            .store
            .withdrawals()
            .list_for_account(account_id)
            .await?;
        Ok(Balance::compute(&orders, &withdrawals))
    }

    /// Withdraw points against an order reference.
    ///
    /// The reference must be a syntactically valid order number; it is not
    /// required to exist in the order ledger. The balance check and the
    /// append run under the account's admission lock.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        raw_order_ref: &str,
        sum: Decimal,
    ) -> Result<(), LedgerError> {
        let order_ref = OrderNumber::parse(raw_order_ref)?;
        if sum <= Decimal::ZERO {
            return Err(LedgerError::InvalidWithdrawalAmount(sum));
        }
        let sum = Points::new(sum)?;

        let lock = self.admission_lock(account_id).await;
        let _guard = lock.lock().await;

        let balance = self.balance(account_id).await?;
        if balance.current < sum.as_decimal() {
            return Err(LedgerError::InsufficientFunds {
                current: balance.current,
                requested: sum.as_decimal(),
            });
        }

        let withdrawal = Withdrawal::new(account_id, order_ref, sum);
        self.store.withdrawals().append(&withdrawal).await?;

        info!(
            %account_id,
            order_ref = %withdrawal.order_ref,
            sum = %withdrawal.sum,
            "Withdrawal committed"
        );
        Ok(())
    }

    /// All withdrawals of an account, ascending by processing time.
    pub async fn withdrawals(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Withdrawal>, LedgerError> {
        Ok(self
            .store
            .withdrawals()
            .list_for_account(account_id)
            .await?)
    }

    async fn admission_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().await;
        locks.entry(account_id).or_default().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
