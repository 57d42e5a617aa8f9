//! Order Application Service
//!
//! Orchestrates order creation through the repository and publisher ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;

use orderflow_types::{
    AppError, EventPublisher, Order, OrderCreatedEvent, OrderId, OrderRepository, UserId,
};

/// How many orders `list_orders` returns, newest first.
const RECENT_ORDERS_LIMIT: i64 = 50;

/// Amounts are fixed-point with at most ten digits and two decimal
/// places, matching the NUMERIC(10, 2) column. Anything finer would be
/// rounded by the store while the published event kept the extra digits.
const AMOUNT_MAX_SCALE: u32 = 2;
const AMOUNT_MAX_DIGITS: u32 = 10;

/// Request to create a new order.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub amount: Decimal,
}

/// Application service for order operations.
///
/// Generic over `R: OrderRepository` and `P: EventPublisher` - the adapters
/// are injected at compile time, so tests run against in-memory ports.
pub struct OrderService<R: OrderRepository, P: EventPublisher> {
    repo: R,
    publisher: Arc<P>,
}

impl<R: OrderRepository, P: EventPublisher> OrderService<R, P> {
    /// Creates a new order service with the given adapters.
    pub fn new(repo: R, publisher: Arc<P>) -> Self {
        Self { repo, publisher }
    }

    /// Persists an order, then announces it on the bus.
    ///
    /// The publish happens strictly after the insert commits, so consumers
    /// never see an order that does not exist. A failed publish surfaces as
    /// an error even though the order row remains; the caller sees the
    /// broker outage instead of a phantom success.
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order, AppError> {
        if req.user_id < 1 {
            return Err(AppError::BadRequest("user_id must be positive".into()));
        }
        if req.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        if req.amount.scale() > AMOUNT_MAX_SCALE {
            return Err(AppError::BadRequest(format!(
                "Amount must have at most {} decimal places",
                AMOUNT_MAX_SCALE
            )));
        }
        if req.amount.mantissa().unsigned_abs() >= 10u128.pow(AMOUNT_MAX_DIGITS) {
            return Err(AppError::BadRequest(format!(
                "Amount must have at most {} digits",
                AMOUNT_MAX_DIGITS
            )));
        }

        let order = self
            .repo
            .create_order(UserId::new(req.user_id), req.amount)
            .await?;

        let event = OrderCreatedEvent::for_order(&order);
        self.publisher.publish(&event).await?;

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_order(&self, id: OrderId) -> Result<Order, AppError> {
        self.repo
            .get_order(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Order {}", id))))
    }

    /// Lists the most recently created orders.
    pub async fn list_orders(&self) -> Result<Vec<Order>, AppError> {
        self.repo
            .list_recent_orders(RECENT_ORDERS_LIMIT)
            .await
            .map_err(Into::into)
    }
}
