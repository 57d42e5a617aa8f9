//! # Orderflow Broker
//!
//! AMQP adapter for the orderflow pipeline. Everything that talks to the
//! broker lives here:
//!
//! - [`Broker`]: one managed connection plus the durable topic exchanges
//!   every component relies on. Hands out channels and reconnects with a
//!   capped exponential backoff when the broker drops.
//! - [`AmqpPublisher`]: implements [`orderflow_types::EventPublisher`] with
//!   persistent deliveries and publisher confirms.
//! - [`QueueConsumer`]: binds a durable queue (with a dead-letter exchange
//!   attached), decodes deliveries, dispatches them to a
//!   [`orderflow_types::HandleEvent`] handler and acknowledges based on the
//!   outcome.
//!
//! The crate deals only in the wire types from `orderflow-types`; nothing
//! here knows about storage or HTTP.

pub mod connection;
pub mod consumer;
pub mod error;
pub mod publisher;

pub use connection::{Broker, BrokerConfig};
pub use consumer::{AckDecision, QueueConsumer, QueueConfig};
pub use error::BrokerError;
pub use publisher::AmqpPublisher;
