//! Domain models for the order-to-payment pipeline.

pub mod order;
pub mod payment;

pub use order::{Order, OrderId, UserId};
pub use payment::{Payment, PaymentId, PaymentStatus};
