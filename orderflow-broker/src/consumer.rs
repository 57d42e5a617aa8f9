//! Durable queue consumption with dead-lettering.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::Channel;
use tracing::{error, info, instrument, warn};

use orderflow_types::{DecodeError, HandleError, HandleEvent, WireEvent};

use crate::connection::Broker;
use crate::error::BrokerError;

/// Queue-side settings for one consumer.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Durable queue this consumer reads from.
    pub queue: String,
    /// Durable queue bound to the dead-letter exchange, so rejected
    /// messages are kept instead of dropped.
    pub dead_letter_queue: String,
    pub consumer_tag: String,
    /// Unacknowledged deliveries the broker may have in flight at once.
    /// 1 keeps processing strictly sequential.
    pub prefetch: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue: "billing.orders".to_string(),
            dead_letter_queue: "billing.orders.dlq".to_string(),
            consumer_tag: "orderflow-billing".to_string(),
            prefetch: 1,
        }
    }
}

/// What to do with a delivery once its outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    /// Acknowledge; the broker drops the message.
    Ack,
    /// Reject and requeue for another attempt.
    Requeue,
    /// Reject without requeue; the queue's dead-letter exchange takes it.
    DeadLetter,
}

/// Maps a handler outcome onto an acknowledgment.
///
/// The broker's redelivered flag is the whole retry budget: a transient
/// failure gets exactly one more attempt, after which the message is
/// dead-lettered rather than bouncing forever. Permanent failures skip the
/// retry and go straight to the dead-letter exchange.
pub fn decide(outcome: &Result<(), HandleError>, redelivered: bool) -> AckDecision {
    match outcome {
        Ok(()) => AckDecision::Ack,
        Err(HandleError::Transient(_)) if !redelivered => AckDecision::Requeue,
        Err(HandleError::Transient(_)) => AckDecision::DeadLetter,
        Err(HandleError::Permanent(_)) => AckDecision::DeadLetter,
    }
}

/// Maps a decode failure onto an acknowledgment.
///
/// An undecodable payload can never succeed, so every decode failure is
/// parked on the dead-letter exchange for inspection instead of requeued,
/// regardless of redelivery.
pub fn decode_decision(err: &DecodeError) -> AckDecision {
    match err {
        DecodeError::Json(_) | DecodeError::WrongTag { .. } | DecodeError::Invalid { .. } => {
            AckDecision::DeadLetter
        }
    }
}

/// Long-running consumer for one event type.
///
/// Binds `QueueConfig::queue` to the shared topic exchange under the
/// event's routing key, then decodes and dispatches deliveries one at a
/// time (per `prefetch`). The queue is declared with an
/// `x-dead-letter-exchange` argument, so every rejected delivery lands in
/// the dead-letter queue with its original routing key intact.
///
/// Acknowledgment is three-way, see [`decide`]. Deliveries that fail to
/// decode never reach the handler; they are dead-lettered directly.
pub struct QueueConsumer<E, H> {
    broker: Arc<Broker>,
    config: QueueConfig,
    handler: H,
    marker: PhantomData<fn() -> E>,
}

impl<E, H> QueueConsumer<E, H>
where
    E: WireEvent,
    H: HandleEvent<E>,
{
    pub fn new(broker: Arc<Broker>, config: QueueConfig, handler: H) -> Self {
        Self {
            broker,
            config,
            handler,
            marker: PhantomData,
        }
    }

    /// Consumes until `shutdown` resolves or a fatal broker error occurs.
    ///
    /// Lost connections are survived by reconnecting with backoff; the
    /// durable queue holds unacknowledged and fresh messages across the
    /// gap. On shutdown the in-flight delivery is finished and acknowledged
    /// before the channel is torn down.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), BrokerError> {
        tokio::pin!(shutdown);

        loop {
            let channel = tokio::select! {
                biased;
                _ = &mut shutdown => return Ok(()),
                channel = self.broker.channel_with_retry() => channel?,
            };

            let mut consumer = match self.bind_queue(&channel).await {
                Ok(consumer) => consumer,
                Err(err) => {
                    let err = BrokerError::from(err);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(error = %err, "Queue setup failed, reconnecting");
                    continue;
                }
            };

            info!(
                queue = %self.config.queue,
                routing_key = E::ROUTING_KEY,
                prefetch = self.config.prefetch,
                "Waiting for deliveries"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        info!(queue = %self.config.queue, "Shutdown requested, stopping consumer");
                        self.teardown(&channel).await;
                        return Ok(());
                    }
                    // Once a delivery arrives, handling runs to completion
                    // before shutdown is looked at again.
                    delivery = consumer.next() => match delivery {
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                        Some(Err(err)) => {
                            warn!(error = %err, "Delivery stream failed, reconnecting");
                            break;
                        }
                        None => {
                            warn!("Delivery stream ended, reconnecting");
                            break;
                        }
                    },
                }
            }
        }
    }

    async fn bind_queue(&self, channel: &Channel) -> Result<lapin::Consumer, lapin::Error> {
        channel
            .basic_qos(self.config.prefetch, BasicQosOptions::default())
            .await?;

        let durable = QueueDeclareOptions {
            durable: true,
            ..Default::default()
        };

        // The dead-letter queue catches everything its exchange receives.
        channel
            .queue_declare(
                &self.config.dead_letter_queue,
                durable,
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                &self.config.dead_letter_queue,
                &self.broker.config().dead_letter_exchange,
                "#",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let mut arguments = FieldTable::default();
        arguments.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(self.broker.config().dead_letter_exchange.as_str().into()),
        );
        channel
            .queue_declare(&self.config.queue, durable, arguments)
            .await?;
        channel
            .queue_bind(
                &self.config.queue,
                &self.broker.config().exchange,
                E::ROUTING_KEY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        channel
            .basic_consume(
                &self.config.queue,
                &self.config.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
    }

    #[instrument(
        skip(self, delivery),
        fields(
            delivery_tag = delivery.delivery_tag,
            redelivered = delivery.redelivered,
        )
    )]
    async fn handle_delivery(&self, delivery: Delivery) {
        let decision = match E::decode(&delivery.data) {
            Ok(event) => {
                let outcome = self.handler.handle(event).await;
                if let Err(err) = &outcome {
                    warn!(error = %err, "Handler failed");
                }
                decide(&outcome, delivery.redelivered)
            }
            Err(err) => {
                error!(
                    error = %err,
                    routing_key = %delivery.routing_key,
                    bytes = delivery.data.len(),
                    "Dead-lettering undecodable message"
                );
                decode_decision(&err)
            }
        };

        let acked = match decision {
            AckDecision::Ack => delivery.ack(BasicAckOptions::default()).await,
            AckDecision::Requeue => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await
            }
            AckDecision::DeadLetter => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
            }
        };
        if let Err(err) = acked {
            // The broker will redeliver; handlers have to tolerate that
            // anyway.
            warn!(error = %err, decision = ?decision, "Failed to acknowledge delivery");
        }
    }

    async fn teardown(&self, channel: &Channel) {
        if let Err(err) = channel
            .basic_cancel(&self.config.consumer_tag, BasicCancelOptions::default())
            .await
        {
            warn!(error = %err, "Failed to cancel consumer cleanly");
        }
        if let Err(err) = channel.close(200, "shutdown").await {
            warn!(error = %err, "Failed to close consumer channel cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use orderflow_types::OrderCreatedEvent;

    #[test]
    fn test_success_is_acked_regardless_of_redelivery() {
        assert_eq!(decide(&Ok(()), false), AckDecision::Ack);
        assert_eq!(decide(&Ok(()), true), AckDecision::Ack);
    }

    #[test]
    fn test_first_transient_failure_is_requeued() {
        let outcome = Err(HandleError::Transient("db pool timed out".into()));
        assert_eq!(decide(&outcome, false), AckDecision::Requeue);
    }

    #[test]
    fn test_redelivered_transient_failure_is_dead_lettered() {
        let outcome = Err(HandleError::Transient("db pool timed out".into()));
        assert_eq!(decide(&outcome, true), AckDecision::DeadLetter);
    }

    #[test]
    fn test_permanent_failure_skips_the_retry() {
        let outcome = Err(HandleError::Permanent("charge declined".into()));
        assert_eq!(decide(&outcome, false), AckDecision::DeadLetter);
        assert_eq!(decide(&outcome, true), AckDecision::DeadLetter);
    }

    #[test]
    fn test_undecodable_payload_is_dead_lettered() {
        let malformed = OrderCreatedEvent::decode(b"not json").unwrap_err();
        assert_eq!(decode_decision(&malformed), AckDecision::DeadLetter);

        let wrong_tag = DecodeError::WrongTag {
            expected: "order_created",
            got: "order_cancelled".to_string(),
        };
        assert_eq!(decode_decision(&wrong_tag), AckDecision::DeadLetter);

        let invalid = DecodeError::Invalid {
            field: "amount",
            reason: "must be positive",
        };
        assert_eq!(decode_decision(&invalid), AckDecision::DeadLetter);
    }
}
