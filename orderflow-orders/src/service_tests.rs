//! OrderService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use orderflow_types::{
        AppError, EventPublisher, Order, OrderId, OrderRepository, PublishError, StoreError,
        UserId, WireEvent,
    };

    use crate::service::{CreateOrderRequest, OrderService};

    /// In-memory repository for testing the service layer.
    pub struct MockRepo {
        orders: Mutex<Vec<Order>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                orders: Mutex::new(Vec::new()),
            }
        }

        pub fn orders(&self) -> Vec<Order> {
            self.orders.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderRepository for MockRepo {
        async fn create_order(
            &self,
            user_id: UserId,
            amount: Decimal,
        ) -> Result<Order, StoreError> {
            let mut orders = self.orders.lock().unwrap();
            let order = Order::from_parts(
                OrderId::new(orders.len() as i64 + 1),
                user_id,
                amount,
                Utc::now(),
            );
            orders.push(order.clone());
            Ok(order)
        }

        async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
            Ok(self
                .orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.id == id)
                .cloned())
        }

        async fn list_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StoreError> {
            let orders = self.orders.lock().unwrap();
            Ok(orders.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    /// Publisher that records what would have gone to the broker.
    pub struct RecordingPublisher {
        events: Mutex<Vec<(String, serde_json::Value)>>,
        broken: bool,
    }

    impl RecordingPublisher {
        pub fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                broken: false,
            }
        }

        /// Publisher whose broker is unreachable.
        pub fn broken() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                broken: true,
            }
        }

        pub fn events(&self) -> Vec<(String, serde_json::Value)> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish<E: WireEvent>(&self, event: &E) -> Result<(), PublishError> {
            if self.broken {
                return Err(PublishError::Unavailable("connection refused".to_string()));
            }
            let value = serde_json::to_value(event).map_err(PublishError::Encode)?;
            self.events
                .lock()
                .unwrap()
                .push((E::ROUTING_KEY.to_string(), value));
            Ok(())
        }
    }

    fn service_with(
        publisher: Arc<RecordingPublisher>,
    ) -> OrderService<MockRepo, RecordingPublisher> {
        OrderService::new(MockRepo::new(), publisher)
    }

    #[tokio::test]
    async fn test_create_order_persists_and_publishes() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher.clone());

        let order = service
            .create_order(CreateOrderRequest {
                user_id: 42,
                amount: dec!(19.99),
            })
            .await
            .unwrap();

        assert_eq!(order.user_id, UserId::new(42));
        assert_eq!(order.amount, dec!(19.99));

        let events = publisher.events();
        assert_eq!(events.len(), 1);
        let (routing_key, body) = &events[0];
        assert_eq!(routing_key, "order_created");
        assert_eq!(body["event"], "order_created");
        // The event carries the committed order's id.
        assert_eq!(body["order_id"], order.id.get());
        assert_eq!(body["amount"], "19.99");
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_user() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher.clone());

        let result = service
            .create_order(CreateOrderRequest {
                user_id: 0,
                amount: dec!(10.00),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_rejects_non_positive_amount() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher.clone());

        for amount in [dec!(0), dec!(-5.00)] {
            let result = service
                .create_order(CreateOrderRequest { user_id: 1, amount })
                .await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert!(publisher.events().is_empty());
    }

    /// Amounts finer than the NUMERIC(10, 2) column would be rounded in
    /// the row while the published event kept the extra digits.
    #[tokio::test]
    async fn test_create_order_rejects_amounts_beyond_wire_precision() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher.clone());

        // Three decimal places, then more than ten digits.
        for amount in [dec!(10.999), dec!(123456789.01)] {
            let result = service
                .create_order(CreateOrderRequest { user_id: 1, amount })
                .await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert!(publisher.events().is_empty());

        // The widest representable amount still passes.
        let order = service
            .create_order(CreateOrderRequest {
                user_id: 1,
                amount: dec!(99999999.99),
            })
            .await
            .unwrap();
        assert_eq!(order.amount, dec!(99999999.99));
    }

    /// The order commits before the publish, so a broker outage surfaces
    /// as an error while the row stays behind.
    #[tokio::test]
    async fn test_create_order_surfaces_publish_failure() {
        let publisher = Arc::new(RecordingPublisher::broken());
        let service = service_with(publisher);

        let result = service
            .create_order(CreateOrderRequest {
                user_id: 1,
                amount: dec!(10.00),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));

        let orders = service.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher);

        let result = service.get_order(OrderId::new(999)).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_returns_newest_first() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(publisher);

        for user_id in 1..=3 {
            service
                .create_order(CreateOrderRequest {
                    user_id,
                    amount: dec!(5.00),
                })
                .await
                .unwrap();
        }

        let orders = service.list_orders().await.unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].user_id, UserId::new(3));
        assert_eq!(orders[2].user_id, UserId::new(1));
    }
}
