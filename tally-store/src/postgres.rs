//! PostgreSQL store implementation.
//!
//! This module uses dynamic queries (sqlx::query) instead of compile-time
//! checked macros (sqlx::query!) to allow compilation without DATABASE_URL.
//!
//! Atomicity notes:
//! - Order creation relies on the primary-key constraint on `number`:
//!   `INSERT ... ON CONFLICT DO NOTHING` followed by an ownership re-read
//!   when no row was inserted, so a racing loser still classifies the
//!   conflict correctly.
//! - Status updates guard on a non-terminal current status in the UPDATE
//!   itself; terminal rows are never touched.

use crate::error::StoreError;
use crate::repository::{
    CreateOutcome, OrderRepository, Store, UpdateOutcome, WithdrawalRepository,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tally_domain::{
    AccountId, Order, OrderNumber, OrderStatus, Points, Withdrawal,
};
use uuid::Uuid;

/// Create the orders and withdrawals tables if they do not exist.
///
/// The `number` primary key is the uniqueness constraint order creation
/// builds on; withdrawals carry their own row identity.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            number      TEXT PRIMARY KEY,
            account_id  UUID NOT NULL,
            status      TEXT NOT NULL,
            accrual     NUMERIC NOT NULL,
            uploaded_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS withdrawals (
            id           UUID PRIMARY KEY,
            account_id   UUID NOT NULL,
            order_ref    TEXT NOT NULL,
            sum          NUMERIC NOT NULL,
            processed_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS orders_status_idx ON orders (status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS withdrawals_account_idx ON withdrawals (account_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Schema ensured");
    Ok(())
}

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool (for testing).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_order_row(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
    let number: String = row
        .try_get("number")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let account_id: Uuid = row
        .try_get("account_id")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let status: String = row
        .try_get("status")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let accrual: Decimal = row
        .try_get("accrual")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let uploaded_at: chrono::DateTime<chrono::Utc> = row
        .try_get("uploaded_at")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    let status = OrderStatus::from_str_encoded(&status)
        .ok_or_else(|| StoreError::Deserialization(format!("invalid order status: {}", status)))?;

    Ok(Order {
        number: OrderNumber::from_trusted(number),
        account_id,
        status,
        accrual: Points::new(accrual)?,
        uploaded_at,
    })
}

fn parse_withdrawal_row(row: &sqlx::postgres::PgRow) -> Result<Withdrawal, StoreError> {
    let id: Uuid = row
        .try_get("id")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let account_id: Uuid = row
        .try_get("account_id")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let order_ref: String = row
        .try_get("order_ref")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let sum: Decimal = row
        .try_get("sum")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
    let processed_at: chrono::DateTime<chrono::Utc> = row
        .try_get("processed_at")
        .map_err(|e| StoreError::Deserialization(e.to_string()))?;

    Ok(Withdrawal {
        id,
        account_id,
        order_ref: OrderNumber::from_trusted(order_ref),
        sum: Points::new(sum)?,
        processed_at,
    })
}

// =============================================================================
// Order Repository Implementation
// =============================================================================

#[async_trait]
impl OrderRepository for PgStore {
    async fn create(&self, order: &Order) -> Result<CreateOutcome, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (number, account_id, status, accrual, uploaded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(order.number.as_str())
        .bind(order.account_id)
        .bind(order.status.as_str())
        .bind(order.accrual.as_decimal())
        .bind(order.uploaded_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(CreateOutcome::Created);
        }

        // Lost the insert: the constraint says a row exists, classify it.
        let owner: Uuid = sqlx::query_scalar("SELECT account_id FROM orders WHERE number = $1")
            .bind(order.number.as_str())
            .fetch_one(&self.pool)
            .await?;

        if owner == order.account_id {
            Ok(CreateOutcome::DuplicateSameOwner)
        } else {
            Ok(CreateOutcome::DuplicateOtherOwner)
        }
    }

    async fn find_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT number, account_id, status, accrual, uploaded_at
            FROM orders
            WHERE number = $1
            "#,
        )
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(parse_order_row).transpose()
    }

    async fn list_for_account(&self, account_id: AccountId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT number, account_id, status, accrual, uploaded_at
            FROM orders
            WHERE account_id = $1
            ORDER BY uploaded_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_order_row).collect()
    }

    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT number, account_id, status, accrual, uploaded_at
            FROM orders
            WHERE status IN ('registered', 'processing')
            ORDER BY uploaded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_order_row).collect()
    }

    async fn apply_update(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: Points,
    ) -> Result<UpdateOutcome, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE number = $1
              AND status IN ('registered', 'processing')
            "#,
        )
        .bind(number.as_str())
        .bind(status.as_str())
        .bind(accrual.as_decimal())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(UpdateOutcome::Applied);
        }

        // Zero rows: either the order is already terminal or it never
        // existed. Re-read to tell the two apart.
        let existing: Option<String> =
            sqlx::query_scalar("SELECT status FROM orders WHERE number = $1")
                .bind(number.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            Some(_) => Ok(UpdateOutcome::AlreadyFinal),
            None => Ok(UpdateOutcome::NotFound),
        }
    }
}

// =============================================================================
// Withdrawal Repository Implementation
// =============================================================================

#[async_trait]
impl WithdrawalRepository for PgStore {
    async fn append(&self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO withdrawals (id, account_id, order_ref, sum, processed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(withdrawal.id)
        .bind(withdrawal.account_id)
        .bind(withdrawal.order_ref.as_str())
        .bind(withdrawal.sum.as_decimal())
        .bind(withdrawal.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, order_ref, sum, processed_at
            FROM withdrawals
            WHERE account_id = $1
            ORDER BY processed_at ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_withdrawal_row).collect()
    }
}

// =============================================================================
// Store Implementation
// =============================================================================

impl Store for PgStore {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn withdrawals(&self) -> &dyn WithdrawalRepository {
        self
    }
}
