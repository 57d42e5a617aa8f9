//! Confirmed, persistent event publishing.

use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::{BasicProperties, Channel};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use orderflow_types::{EventPublisher, PublishError, WireEvent};

use crate::connection::Broker;
use crate::error::BrokerError;

/// Publishes events to the shared topic exchange.
///
/// Every delivery is persistent and waits for a publisher confirm, so a
/// successful `publish` means the broker has the message on disk. On a
/// transient failure the channel is replaced and the publish retried once;
/// after that the error goes back to the caller.
pub struct AmqpPublisher {
    broker: Arc<Broker>,
    channel: Mutex<Channel>,
}

impl AmqpPublisher {
    pub async fn new(broker: Arc<Broker>) -> Result<Self, BrokerError> {
        let channel = Self::open(&broker).await?;
        Ok(Self {
            broker,
            channel: Mutex::new(channel),
        })
    }

    /// Closes the publishing channel. Failures are logged, not returned.
    pub async fn close(&self) {
        let channel = self.channel.lock().await.clone();
        if let Err(err) = channel.close(200, "shutdown").await {
            warn!(error = %err, "Failed to close publisher channel cleanly");
        }
    }

    async fn open(broker: &Broker) -> Result<Channel, BrokerError> {
        let channel = broker.channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(BrokerError::from)?;
        Ok(channel)
    }

    async fn refresh_channel(&self) -> Result<(), BrokerError> {
        let fresh = Self::open(&self.broker).await?;
        *self.channel.lock().await = fresh;
        Ok(())
    }

    async fn try_publish(&self, routing_key: &str, payload: &[u8]) -> Result<(), PublishError> {
        let channel = self.channel.lock().await.clone();
        let properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_content_type("application/json".into());

        let confirm = channel
            .basic_publish(
                &self.broker.config().exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;

        let timeout = self.broker.config().confirm_timeout;
        match tokio::time::timeout(timeout, confirm).await {
            Err(_) => Err(PublishError::NotConfirmed),
            Ok(Err(e)) => Err(PublishError::Unavailable(e.to_string())),
            Ok(Ok(Confirmation::Nack(_))) => Err(PublishError::NotConfirmed),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish<E: WireEvent>(&self, event: &E) -> Result<(), PublishError> {
        let payload = event.encode()?;

        match self.try_publish(E::ROUTING_KEY, &payload).await {
            Ok(()) => {
                debug!(
                    routing_key = E::ROUTING_KEY,
                    bytes = payload.len(),
                    "Event published"
                );
                Ok(())
            }
            Err(err) if err.is_transient() => {
                warn!(
                    routing_key = E::ROUTING_KEY,
                    error = %err,
                    "Publish failed, replacing channel and retrying once"
                );
                self.refresh_channel()
                    .await
                    .map_err(|e| PublishError::Unavailable(e.to_string()))?;
                self.try_publish(E::ROUTING_KEY, &payload).await?;
                debug!(
                    routing_key = E::ROUTING_KEY,
                    bytes = payload.len(),
                    "Event published after channel refresh"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
