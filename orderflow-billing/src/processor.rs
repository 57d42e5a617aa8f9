//! Order settlement: the handler behind the billing queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use orderflow_types::{
    EventPublisher, HandleError, HandleEvent, OrderCreatedEvent, Payment, PaymentGateway,
    PaymentProcessedEvent, PaymentRepository,
};

/// Attempts for the post-commit result publish before the event is dropped.
const RESULT_PUBLISH_ATTEMPTS: u32 = 3;
const RESULT_PUBLISH_BACKOFF: Duration = Duration::from_millis(250);

/// Turns one `order_created` event into one settled payment.
///
/// Settlement is a single storage transaction (insert `processing`, charge
/// through the gateway, mark `completed`), so a crash mid-way leaves
/// either a committed payment or nothing. The `payment_processed` event
/// goes out only after the commit.
///
/// Deliveries are not deduplicated: a redelivered order event settles
/// again and produces a second payment row.
pub struct PaymentProcessor<S, P, G> {
    store: Arc<S>,
    publisher: Arc<P>,
    gateway: G,
}

impl<S, P, G> PaymentProcessor<S, P, G>
where
    S: PaymentRepository,
    P: EventPublisher,
    G: PaymentGateway,
{
    pub fn new(store: Arc<S>, publisher: Arc<P>, gateway: G) -> Self {
        Self {
            store,
            publisher,
            gateway,
        }
    }

    /// Best effort with bounded retries. The payment is already committed;
    /// failing the handler after commit would settle the order again on
    /// redelivery, so exhausted retries drop the event instead.
    async fn publish_result(&self, payment: &Payment) {
        let event = PaymentProcessedEvent::for_payment(payment);
        for attempt in 1..=RESULT_PUBLISH_ATTEMPTS {
            match self.publisher.publish(&event).await {
                Ok(()) => {
                    debug!(payment_id = %payment.id, "Published payment_processed");
                    return;
                }
                Err(err) if err.is_transient() && attempt < RESULT_PUBLISH_ATTEMPTS => {
                    warn!(attempt, error = %err, "Result publish failed, retrying");
                    tokio::time::sleep(RESULT_PUBLISH_BACKOFF * attempt).await;
                }
                Err(err) => {
                    error!(
                        payment_id = %payment.id,
                        order_id = %payment.order_id,
                        error = %err,
                        "Dropping payment_processed event after failed publish"
                    );
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl<S, P, G> HandleEvent<OrderCreatedEvent> for PaymentProcessor<S, P, G>
where
    S: PaymentRepository,
    P: EventPublisher,
    G: PaymentGateway,
{
    async fn handle(&self, event: OrderCreatedEvent) -> Result<(), HandleError> {
        let payment = self.store.settle_order(&event, &self.gateway).await?;

        info!(
            order_id = %payment.order_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            "Payment completed"
        );

        self.publish_result(&payment).await;
        Ok(())
    }
}
