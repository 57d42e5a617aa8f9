//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The services depend on these traits, not concrete implementations.

mod gateway;
mod messaging;
mod repository;

pub use gateway::PaymentGateway;
pub use messaging::{EventPublisher, HandleEvent};
pub use repository::{OrderRepository, PaymentRepository};
