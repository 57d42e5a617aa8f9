//! # Orderflow Types
//!
//! Domain types, wire events, and port traits for the order-to-payment
//! pipeline. This crate has ZERO external IO dependencies - only data
//! structures, business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Order, Payment, id newtypes)
//! - `events/` - Wire messages exchanged over the broker, with strict decoding
//! - `ports/` - Trait definitions that adapters must implement
//! - `error/` - Error types per layer

pub mod domain;
pub mod error;
pub mod events;
pub mod ports;

// Re-export commonly used types
pub use domain::{Order, OrderId, Payment, PaymentId, PaymentStatus, UserId};
pub use error::{AppError, DecodeError, GatewayError, HandleError, PublishError, StoreError};
pub use events::{OrderCreatedEvent, PaymentProcessedEvent, WireEvent};
pub use ports::{EventPublisher, HandleEvent, OrderRepository, PaymentGateway, PaymentRepository};
