//! Test helper functions for order numbers and store seeding.

use rust_decimal::Decimal;
use tally_domain::{AccountId, Order, OrderNumber, OrderStatus, Points, Withdrawal};
use tally_store::{CreateOutcome, OrderRepository, Store, StoreError, WithdrawalRepository};

/// Build a checksum-valid order number from a numeric seed.
///
/// Appends the Luhn check digit to the seed's decimal digits, so distinct
/// seeds yield distinct valid numbers.
pub fn order_number(seed: u64) -> OrderNumber {
    let payload = seed.to_string();

    let mut sum = 0u32;
    for (i, b) in payload.bytes().rev().enumerate() {
        let mut d = (b - b'0') as u32;
        // The check digit will occupy the rightmost position, shifting
        // every payload digit one slot left.
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    let check = (10 - sum % 10) % 10;

    OrderNumber::parse(&format!("{}{}", payload, check))
        .expect("generated number must pass its own checksum")
}

/// Insert an order directly in `Processed` status with the given accrual.
pub async fn seed_processed_order(
    store: &dyn Store,
    account_id: AccountId,
    number: OrderNumber,
    accrual: Decimal,
) -> Result<Order, StoreError> {
    let order = Order::new(number, account_id);
    let outcome = store.orders().create(&order).await?;
    assert_eq!(outcome, CreateOutcome::Created, "seed order already exists");

    store
        .orders()
        .apply_update(&order.number, OrderStatus::Processed, Points::new(accrual)?)
        .await?;

    let seeded = store
        .orders()
        .find_by_number(&order.number)
        .await?
        .expect("seeded order must be readable");
    Ok(seeded)
}

/// Append a withdrawal row directly, bypassing admission checks.
pub async fn seed_withdrawal(
    store: &dyn Store,
    account_id: AccountId,
    order_ref: OrderNumber,
    sum: Decimal,
) -> Result<Withdrawal, StoreError> {
    let withdrawal = Withdrawal::new(account_id, order_ref, Points::new(sum)?);
    store.withdrawals().append(&withdrawal).await?;
    Ok(withdrawal)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_domain::Balance;
    use tally_store::MemoryStore;
    use uuid::Uuid;

    #[test]
    fn test_order_number_generator_is_valid_and_distinct() {
        let a = order_number(7992739871);
        assert_eq!(a.as_str(), "79927398713");

        let numbers: Vec<_> = (1u64..=20).map(order_number).collect();
        for (i, n) in numbers.iter().enumerate() {
            for other in &numbers[i + 1..] {
                assert_ne!(n, other);
            }
        }
    }

    #[tokio::test]
    async fn test_seeded_state_produces_expected_balance() {
        let store = MemoryStore::new();
        let account_id = Uuid::now_v7();

        seed_processed_order(&store, account_id, order_number(1), dec!(500))
            .await
            .unwrap();
        seed_withdrawal(&store, account_id, order_number(2), dec!(200))
            .await
            .unwrap();

        let orders = store.orders().list_for_account(account_id).await.unwrap();
        let withdrawals = store
            .withdrawals()
            .list_for_account(account_id)
            .await
            .unwrap();

        let balance = Balance::compute(&orders, &withdrawals);
        assert_eq!(balance.current, dec!(300));
        assert_eq!(balance.withdrawn, dec!(200));
    }
}
