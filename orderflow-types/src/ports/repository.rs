//! Repository ports.
//!
//! Adapters (Postgres, SQLite) implement these traits. Operations that
//! span multiple writes MUST be atomic; implementations use database
//! transactions to ensure consistency.

use rust_decimal::Decimal;

use crate::domain::{Order, OrderId, Payment, PaymentId, UserId};
use crate::error::StoreError;
use crate::events::OrderCreatedEvent;
use crate::ports::PaymentGateway;

/// Persistence for placed orders.
#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts a new order and returns it with its generated id.
    async fn create_order(&self, user_id: UserId, amount: Decimal) -> Result<Order, StoreError>;

    /// Gets an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Lists the most recently created orders, newest first.
    async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError>;
}

/// Persistence for payments, including the settlement unit itself.
#[async_trait::async_trait]
pub trait PaymentRepository: Send + Sync + 'static {
    /// Settles one order event inside a single transaction:
    /// insert a `processing` payment row, run the gateway charge, then
    /// mark the row `completed`. Any failure rolls the whole unit back;
    /// the `processing` row must not survive a rollback.
    ///
    /// Deliberately not idempotent: a redelivered event creates a
    /// second, independent payment row for the same order.
    async fn settle_order(
        &self,
        event: &OrderCreatedEvent,
        gateway: &dyn PaymentGateway,
    ) -> Result<Payment, StoreError>;

    /// Gets a payment by id.
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    /// Lists every payment attached to an order, oldest first.
    async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError>;

    /// Marks non-terminal rows left behind by an aborted process as
    /// `failed`. Run at startup; returns how many rows were reconciled.
    async fn fail_stale_processing(&self) -> Result<u64, StoreError>;
}
