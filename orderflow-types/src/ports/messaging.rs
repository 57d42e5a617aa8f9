//! Messaging ports: publishing events and handling deliveries.

use crate::error::{HandleError, PublishError};
use crate::events::WireEvent;

/// Hands a typed event to the broker under the event's routing key.
///
/// Delivery contract is at-least-once: a returned `Ok` means the broker
/// confirmed the hand-off, not that a consumer has seen it. A transient
/// error is safe to retry; retrying may duplicate the event.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish<E: WireEvent>(&self, event: &E) -> Result<(), PublishError>;
}

/// Processes one successfully decoded message.
///
/// The returned outcome drives the consumer's acknowledgment decision,
/// so implementations must classify their failures as transient or
/// permanent rather than letting the distinction collapse into one
/// error path.
#[async_trait::async_trait]
pub trait HandleEvent<E: WireEvent>: Send + Sync + 'static {
    async fn handle(&self, event: E) -> Result<(), HandleError>;
}
