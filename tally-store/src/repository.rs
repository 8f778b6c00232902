//! Repository trait definitions (Ports)
//!
//! These traits define the storage interface for the domain.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use tally_domain::{AccountId, Order, OrderNumber, OrderStatus, Points, Withdrawal};

/// Outcome of an order creation attempt.
///
/// The duplicate variants are detected atomically with the insert; a racing
/// insert loss is reinterpreted by re-reading ownership, so callers never
/// see a bare constraint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// No row existed; the order was inserted as `Registered`
    Created,
    /// A row with this number already belongs to the same account
    DuplicateSameOwner,
    /// A row with this number belongs to a different account
    DuplicateOtherOwner,
}

/// Outcome of a status update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The row was updated
    Applied,
    /// The row is already in a terminal status; nothing was changed.
    /// Covers both a repeat of the same terminal status and an attempt
    /// to move a terminal row elsewhere (terminal states are sticky).
    AlreadyFinal,
    /// No row with this number exists
    NotFound,
}

/// Repository for Order entities
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order, or report which kind of duplicate blocked it.
    ///
    /// Must be atomic with respect to concurrent creations of the same
    /// number.
    async fn create(&self, order: &Order) -> Result<CreateOutcome, StoreError>;

    /// Find an order by its number
    async fn find_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError>;

    /// All orders of one account, ascending by upload time
    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Order>, StoreError>;

    /// All non-terminal orders across every account.
    ///
    /// Used exclusively by the reconciler to build its poll set.
    async fn list_pending(&self) -> Result<Vec<Order>, StoreError>;

    /// Apply a status update, leaving terminal rows untouched.
    async fn apply_update(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Points,
    ) -> Result<UpdateOutcome, StoreError>;
}

/// Repository for Withdrawal entities (append-only)
#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    /// Append a committed withdrawal
    async fn append(&self, withdrawal: &Withdrawal) -> Result<(), StoreError>;

    /// All withdrawals of one account, ascending by processing time
    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Withdrawal>, StoreError>;
}

/// Combined store interface
pub trait Store: Send + Sync {
    /// Get order repository
    fn orders(&self) -> &dyn OrderRepository;

    /// Get withdrawal repository
    fn withdrawals(&self) -> &dyn WithdrawalRepository;
}
