//! PostgreSQL store adapter.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use orderflow_types::{
    Order, OrderCreatedEvent, OrderId, OrderRepository, Payment, PaymentGateway, PaymentId,
    PaymentRepository, PaymentStatus, StoreError, UserId,
};

use crate::types::{DbId, DbOrder, DbPayment, map_sqlx};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL store implementation. Amounts are NUMERIC, timestamps
/// TIMESTAMPTZ.
pub struct PostgresStore {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_orders_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payments_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresStore {
    /// Creates a new PostgreSQL store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Order repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn create_order(&self, user_id: UserId, amount: Decimal) -> Result<Order, StoreError> {
        let now = Utc::now();

        let row: DbId = sqlx::query_as(
            r#"INSERT INTO orders (user_id, amount, created_at) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(user_id.get())
        .bind(amount)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Order::from_parts(OrderId::new(row.id), user_id, amount, now))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<DbOrder> = sqlx::query_as(
            r#"SELECT id, user_id, amount, created_at FROM orders WHERE id = $1"#,
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
               ORDER BY created_at DESC, id DESC LIMIT $1"#,
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
impl PaymentRepository for PostgresStore {
    async fn settle_order(
        &self,
        event: &OrderCreatedEvent,
        gateway: &dyn PaymentGateway,
    ) -> Result<Payment, StoreError> {
        let created_at = Utc::now();

        let mut db_tx = self.pool.begin().await.map_err(map_sqlx)?;

        // The id is needed before commit so the result event can carry it.
        let row: DbId = sqlx::query_as(
            r#"INSERT INTO payments (order_id, user_id, amount, status, created_at)
               VALUES ($1, $2, $3, 'processing', $4) RETURNING id"#,
        )
        .bind(event.order_id.get())
        .bind(event.user_id.get())
        .bind(event.amount)
        .bind(created_at)
        .fetch_one(&mut *db_tx)
        .await
        .map_err(map_sqlx)?;

        // Any gateway failure drops the transaction, so the `processing`
        // row never outlives a failed unit.
        gateway
            .charge(event.order_id, event.user_id, event.amount)
            .await?;

        let processed_at = Utc::now();

        sqlx::query(r#"UPDATE payments SET status = 'completed', processed_at = $1 WHERE id = $2"#)
            .bind(processed_at)
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
               FROM payments WHERE id = $1"#,
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
               FROM payments WHERE order_id = $1 ORDER BY id ASC"#,
        )
        .bind(order_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn fail_stale_processing(&self) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"UPDATE payments SET status = 'failed' WHERE status IN ('pending', 'processing')"#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(result.rows_affected())
    }
}
