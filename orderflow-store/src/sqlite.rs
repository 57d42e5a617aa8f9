//! SQLite store adapter.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;

use orderflow_types::{
    Order, OrderCreatedEvent, OrderId, OrderRepository, Payment, PaymentGateway, PaymentId,
    PaymentRepository, PaymentStatus, StoreError, UserId,
};

use crate::types::{DbId, DbOrder, DbPayment, map_sqlx};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite store implementation. Decimals and timestamps travel as TEXT.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration files
        let ddl_orders = include_str!("../migrations/0001_create_orders.sql");
        sqlx::query(ddl_orders).execute(&pool).await?;

        let ddl_payments = include_str!("../migrations/0002_create_payments.sql");
        sqlx::query(ddl_payments).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Order repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OrderRepository for SqliteStore {
    async fn create_order(&self, user_id: UserId, amount: Decimal) -> Result<Order, StoreError> {
        let now = Utc::now();
        let amount_str = amount.to_string();
        let created_at_str = now.to_rfc3339();

        let row: DbId = sqlx::query_as(
            r#"INSERT INTO orders (user_id, amount, created_at) VALUES (?, ?, ?) RETURNING id"#,
        )
        .bind(user_id.get())
        .bind(&amount_str)
        .bind(&created_at_str)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Order::from_parts(OrderId::new(row.id), user_id, amount, now))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<DbOrder> = sqlx::query_as(
            r#"SELECT id, user_id, amount, created_at FROM orders WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(DbOrder::into_domain).transpose()
    }

    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<DbOrder> = sqlx::query_as(
            r#"SELECT id, user_id, amount, created_at FROM orders
               ORDER BY created_at DESC, id DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(DbOrder::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentRepository for SqliteStore {
    async fn settle_order(
        &self,
        event: &OrderCreatedEvent,
        gateway: &dyn PaymentGateway,
    ) -> Result<Payment, StoreError> {
        let created_at = Utc::now();
        let amount_str = event.amount.to_string();
        let created_at_str = created_at.to_rfc3339();

        let mut db_tx = self.pool.begin().await.map_err(map_sqlx)?;

        // The id is needed before commit so the result event can carry it.
        let row: DbId = sqlx::query_as(
            r#"INSERT INTO payments (order_id, user_id, amount, status, created_at)
               VALUES (?, ?, ?, 'processing', ?) RETURNING id"#,
        )
        .bind(event.order_id.get())
        .bind(event.user_id.get())
        .bind(&amount_str)
        .bind(&created_at_str)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(map_sqlx)?;

        // Any gateway failure drops the transaction, so the `processing`
        // row never outlives a failed unit.
        gateway
            .charge(event.order_id, event.user_id, event.amount)
            .await?;

        let processed_at = Utc::now();
        let processed_at_str = processed_at.to_rfc3339();

        sqlx::query(r#"UPDATE payments SET status = 'completed', processed_at = ? WHERE id = ?"#)
            .bind(&processed_at_str)
            .bind(row.id)
            .execute(&mut *db_tx)
            .await
            .map_err(map_sqlx)?;

        db_tx.commit().await.map_err(map_sqlx)?;

        Ok(Payment::from_parts(
            PaymentId::new(row.id),
            event.order_id,
            event.user_id,
            event.amount,
            PaymentStatus::Completed,
            Some(processed_at),
            created_at,
        ))
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        let row: Option<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_id, user_id, amount, status, processed_at, created_at
               FROM payments WHERE id = ?"#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError> {
        let rows: Vec<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_id, user_id, amount, status, processed_at, created_at
               FROM payments WHERE order_id = ? ORDER BY id ASC"#,
        )
        .bind(order_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn fail_stale_processing(&self) -> Result<u64, StoreError> {
        let result =
            sqlx::query(r#"UPDATE payments SET status = 'failed' WHERE status IN ('pending', 'processing')"#)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }
}
