//! PaymentProcessor unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use orderflow_types::{
        EventPublisher, GatewayError, HandleError, HandleEvent, Order, OrderCreatedEvent, OrderId,
        Payment, PaymentGateway, PaymentId, PaymentRepository, PaymentStatus, PublishError,
        StoreError, UserId, WireEvent,
    };

    use crate::gateway::AutoApproveGateway;
    use crate::processor::PaymentProcessor;

    /// In-memory store for testing the settlement flow.
    pub struct MockStore {
        payments: Mutex<Vec<Payment>>,
        fail_next: Mutex<Option<StoreError>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                payments: Mutex::new(Vec::new()),
                fail_next: Mutex::new(None),
            }
        }

        pub fn fail_next(&self, err: StoreError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        pub fn payments(&self) -> Vec<Payment> {
            self.payments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentRepository for MockStore {
        async fn settle_order(
            &self,
            event: &OrderCreatedEvent,
            gateway: &dyn PaymentGateway,
        ) -> Result<Payment, StoreError> {
            if let Some(err) = self.fail_next.lock().unwrap().take() {
                return Err(err);
            }

            gateway
                .charge(event.order_id, event.user_id, event.amount)
                .await?;

            let mut payments = self.payments.lock().unwrap();
            let now = Utc::now();
            let payment = Payment::from_parts(
                PaymentId::new(payments.len() as i64 + 1),
                event.order_id,
                event.user_id,
                event.amount,
                PaymentStatus::Completed,
                Some(now),
                now,
            );
            payments.push(payment.clone());
            Ok(payment)
        }

        async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned())
        }

        async fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError> {
            Ok(self
                .payments
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.order_id == order_id)
                .cloned()
                .collect())
        }

        async fn fail_stale_processing(&self) -> Result<u64, StoreError> {
            Ok(0)
        }
    }

    /// Publisher that records what would have gone to the broker.
    pub struct RecordingPublisher {
        events: Mutex<Vec<(String, serde_json::Value)>>,
        fail_remaining: Mutex<u32>,
        fail_always: bool,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail_remaining: Mutex::new(0),
                fail_always: false,
            }
        }

        /// Fails the first `times` publishes, then succeeds.
        pub fn failing(times: u32) -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail_remaining: Mutex::new(times),
                fail_always: false,
            }
        }

        pub fn always_failing() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail_remaining: Mutex::new(0),
                fail_always: true,
            }
        }

        pub fn events(&self) -> Vec<(String, serde_json::Value)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish<E: WireEvent>(&self, event: &E) -> Result<(), PublishError> {
            if self.fail_always {
                return Err(PublishError::NotConfirmed);
            }
            {
                let mut remaining = self.fail_remaining.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PublishError::NotConfirmed);
                }
            }
            let value = serde_json::to_value(event).map_err(PublishError::Encode)?;
            self.events
                .lock()
                .unwrap()
                .push((E::ROUTING_KEY.to_string(), value));
            Ok(())
        }
    }

    /// Gateway that declines every charge.
    struct DecliningGateway;

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        async fn charge(
            &self,
            _order_id: OrderId,
            _user_id: UserId,
            _amount: rust_decimal::Decimal,
        ) -> Result<(), GatewayError> {
            Err(GatewayError::Declined("insufficient funds".to_string()))
        }
    }

    fn order_event(order_id: i64) -> OrderCreatedEvent {
        let order = Order::from_parts(
            OrderId::new(order_id),
            UserId::new(10),
            dec!(99.90),
            Utc::now(),
        );
        OrderCreatedEvent::for_order(&order)
    }

    #[tokio::test]
    async fn test_order_event_settles_and_publishes_result() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        processor.handle(order_event(1)).await.unwrap();

        let payments = store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].order_id, OrderId::new(1));
        assert_eq!(payments[0].status, PaymentStatus::Completed);
        assert!(payments[0].processed_at.is_some());

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        let (routing_key, body) = &events[0];
        assert_eq!(routing_key, "payment_processed");
        assert_eq!(body["event"], "payment_processed");
        assert_eq!(body["order_id"], 1);
        assert_eq!(body["payment_id"], 1);
        assert_eq!(body["status"], "completed");
        // Money stays a fixed-point string on the wire.
        assert_eq!(body["amount"], "99.90");
    }

    #[tokio::test]
    async fn test_transient_store_failure_is_reported_transient() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        store.fail_next(StoreError::Unavailable("pool timed out".to_string()));
        let result = processor.handle(order_event(1)).await;

        assert!(matches!(result, Err(HandleError::Transient(_))));
        assert!(store.payments().is_empty());
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_declined_charge_is_permanent_and_publishes_nothing() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let processor = PaymentProcessor::new(store.clone(), publisher.clone(), DecliningGateway);

        let result = processor.handle(order_event(1)).await;

        assert!(matches!(result, Err(HandleError::Permanent(_))));
        assert!(store.payments().is_empty());
        assert!(publisher.events().is_empty());
    }

    /// Current behavior, on purpose: no deduplication, so the same order
    /// delivered twice settles twice.
    #[tokio::test]
    async fn test_redelivered_order_event_settles_twice() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        processor.handle(order_event(7)).await.unwrap();
        processor.handle(order_event(7)).await.unwrap();

        let payments = store.payments();
        assert_eq!(payments.len(), 2);
        assert_ne!(payments[0].id, payments[1].id);
        assert!(payments.iter().all(|p| p.order_id == OrderId::new(7)));

        assert_eq!(publisher.events().len(), 2);
    }

    #[tokio::test]
    async fn test_sequential_events_settle_in_order() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        processor.handle(order_event(1)).await.unwrap();
        processor.handle(order_event(2)).await.unwrap();

        let payments = store.payments();
        assert_eq!(payments[0].order_id, OrderId::new(1));
        assert_eq!(payments[1].order_id, OrderId::new(2));

        let events = publisher.events();
        assert_eq!(events[0].1["order_id"], 1);
        assert_eq!(events[1].1["order_id"], 2);
    }

    #[tokio::test]
    async fn test_result_publish_retries_after_transient_failure() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::failing(1));
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        processor.handle(order_event(1)).await.unwrap();

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "payment_processed");
    }

    #[tokio::test]
    async fn test_result_publish_failure_does_not_fail_the_handler() {
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::always_failing());
        let processor =
            PaymentProcessor::new(store.clone(), publisher.clone(), AutoApproveGateway);

        // The payment is committed before publishing, so the handler must
        // report success even when the result event never makes it out.
        processor.handle(order_event(1)).await.unwrap();

        assert_eq!(store.payments().len(), 1);
        assert!(publisher.events().is_empty());
    }
}
