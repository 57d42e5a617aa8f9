//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use orderflow_types::{Order, OrderId, Payment, PaymentId, PaymentStatus, StoreError, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use rust_decimal::Decimal;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Generated-id row for INSERT .. RETURNING id.
#[derive(FromRow)]
pub struct DbId {
    pub id: i64,
}

/// Order row from database.
#[derive(FromRow)]
pub struct DbOrder {
    pub id: i64,
    pub user_id: i64,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

/// Payment row from database.
#[derive(FromRow)]
pub struct DbPayment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,

    #[cfg(not(feature = "sqlite"))]
    pub amount: Decimal,
    #[cfg(feature = "sqlite")]
    pub amount: String,

    pub status: String,

    #[cfg(not(feature = "sqlite"))]
    pub processed_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub processed_at: Option<String>,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, StoreError> {
    match s {
        "pending" => Ok(PaymentStatus::Pending),
        "processing" => Ok(PaymentStatus::Processing),
        "completed" => Ok(PaymentStatus::Completed),
        "failed" => Ok(PaymentStatus::Failed),
        _ => Err(StoreError::Corrupt(format!("Unknown payment status: {}", s))),
    }
}

#[cfg(feature = "sqlite")]
fn parse_amount(s: &str) -> Result<rust_decimal::Decimal, StoreError> {
    s.parse()
        .map_err(|e| StoreError::Corrupt(format!("Bad amount {:?}: {}", s, e)))
}

#[cfg(feature = "sqlite")]
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| StoreError::Corrupt(format!("Bad timestamp {:?}: {}", s, e)))
}

/// Classifies driver errors so callers can tell retryable outages apart
/// from permanent query failures.
pub fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Database(err.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbOrder {
    /// Convert database row to domain Order.
    pub fn into_domain(self) -> Result<Order, StoreError> {
        #[cfg(not(feature = "sqlite"))]
        let (amount, created_at) = (self.amount, self.created_at);

        #[cfg(feature = "sqlite")]
        let (amount, created_at) = (parse_amount(&self.amount)?, parse_timestamp(&self.created_at)?);

        Ok(Order::from_parts(
            OrderId::new(self.id),
            UserId::new(self.user_id),
            amount,
            created_at,
        ))
    }
}

impl DbPayment {
    /// Convert database row to domain Payment.
    pub fn into_domain(self) -> Result<Payment, StoreError> {
        let status = parse_payment_status(&self.status)?;

        #[cfg(not(feature = "sqlite"))]
        let (amount, processed_at, created_at) = (self.amount, self.processed_at, self.created_at);

        #[cfg(feature = "sqlite")]
        let (amount, processed_at, created_at) = (
            parse_amount(&self.amount)?,
            self.processed_at.as_deref().map(parse_timestamp).transpose()?,
            parse_timestamp(&self.created_at)?,
        );

        Ok(Payment::from_parts(
            PaymentId::new(self.id),
            OrderId::new(self.order_id),
            UserId::new(self.user_id),
            amount,
            status,
            processed_at,
            created_at,
        ))
    }
}
