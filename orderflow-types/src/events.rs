//! Wire events exchanged over the broker.
//!
//! Every message type fixes its routing key and `event` tag at the type
//! level; decoding is strict (well-formed JSON, matching tag, valid
//! fields) and returns an explicit error instead of a loosely-typed map.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::{Order, OrderId, Payment, PaymentId, PaymentStatus, UserId};
use crate::error::DecodeError;

/// Routing and schema contract for one broker message type.
pub trait WireEvent: Serialize + DeserializeOwned + Send + Sync {
    /// Routing key the event is published and consumed under.
    const ROUTING_KEY: &'static str;

    /// Required value of the `event` tag field.
    const EVENT_TAG: &'static str;

    /// Tag carried by this value.
    fn tag(&self) -> &str;

    /// Field-level constraints beyond JSON well-formedness.
    fn validate(&self) -> Result<(), DecodeError>;

    /// Serializes to UTF-8 JSON bytes.
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Strict decode: parse, check the tag, validate the fields.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let event: Self = serde_json::from_slice(bytes)?;
        if event.tag() != Self::EVENT_TAG {
            return Err(DecodeError::WrongTag {
                expected: Self::EVENT_TAG,
                got: event.tag().to_string(),
            });
        }
        event.validate()?;
        Ok(event)
    }
}

/// Published by the order service once an order row is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    /// Constant tag, always `order_created`
    pub event: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Serialized as a fixed-point string; must round-trip exactly
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderCreatedEvent {
    pub fn new(
        order_id: OrderId,
        user_id: UserId,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event: Self::EVENT_TAG.to_string(),
            order_id,
            user_id,
            amount,
            created_at,
        }
    }

    /// Builds the event announcing a freshly committed order.
    pub fn for_order(order: &Order) -> Self {
        Self::new(order.id, order.user_id, order.amount, order.created_at)
    }
}

impl WireEvent for OrderCreatedEvent {
    const ROUTING_KEY: &'static str = "order_created";
    const EVENT_TAG: &'static str = "order_created";

    fn tag(&self) -> &str {
        &self.event
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.order_id.get() < 1 {
            return Err(DecodeError::Invalid {
                field: "order_id",
                reason: "must be a positive integer",
            });
        }
        if self.user_id.get() < 1 {
            return Err(DecodeError::Invalid {
                field: "user_id",
                reason: "must be a positive integer",
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(DecodeError::Invalid {
                field: "amount",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

/// Published by the billing service once a payment reaches a terminal
/// status. Emitted only after the payment row is durably committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProcessedEvent {
    /// Constant tag, always `payment_processed`
    pub event: String,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_id: PaymentId,
    pub amount: Decimal,
    /// Terminal only: `completed` or `failed`
    pub status: PaymentStatus,
    pub processed_at: DateTime<Utc>,
}

impl PaymentProcessedEvent {
    /// Builds the result event for a settled payment.
    pub fn for_payment(payment: &Payment) -> Self {
        Self {
            event: Self::EVENT_TAG.to_string(),
            order_id: payment.order_id,
            user_id: payment.user_id,
            payment_id: payment.id,
            amount: payment.amount,
            status: payment.status,
            processed_at: payment.processed_at.unwrap_or(payment.created_at),
        }
    }
}

impl WireEvent for PaymentProcessedEvent {
    const ROUTING_KEY: &'static str = "payment_processed";
    const EVENT_TAG: &'static str = "payment_processed";

    fn tag(&self) -> &str {
        &self.event
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.order_id.get() < 1 {
            return Err(DecodeError::Invalid {
                field: "order_id",
                reason: "must be a positive integer",
            });
        }
        if self.user_id.get() < 1 {
            return Err(DecodeError::Invalid {
                field: "user_id",
                reason: "must be a positive integer",
            });
        }
        if self.payment_id.get() < 1 {
            return Err(DecodeError::Invalid {
                field: "payment_id",
                reason: "must be a positive integer",
            });
        }
        if self.amount <= Decimal::ZERO {
            return Err(DecodeError::Invalid {
                field: "amount",
                reason: "must be greater than zero",
            });
        }
        if !self.status.is_terminal() {
            return Err(DecodeError::Invalid {
                field: "status",
                reason: "must be a terminal status",
            });
        }
        Ok(())
    }
}
