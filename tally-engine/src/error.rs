//! Engine error types.

use rust_decimal::Decimal;
use tally_domain::DomainError;
use tally_store::StoreError;
use thiserror::Error;

/// Errors surfaced by ledger operations.
///
/// Idempotent repeats (`SubmitOutcome::AlreadyAccepted`, updates to
/// terminal orders) are successes, not errors, and never appear here.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Order number failed validation; nothing was touched
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The order number is already registered to a different account
    #[error("Order belongs to another account")]
    OrderOwnedByOther,

    /// Withdrawal sum must be strictly positive
    #[error("Withdrawal amount must be positive, got {0}")]
    InvalidWithdrawalAmount(Decimal),

    /// The account's current balance does not cover the requested sum
    #[error("Insufficient funds: balance {current}, requested {requested}")]
    InsufficientFunds {
        current: Decimal,
        requested: Decimal,
    },

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
