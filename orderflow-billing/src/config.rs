//! Configuration loading from environment.

use std::env;

use orderflow_broker::{BrokerConfig, QueueConfig};

/// Billing worker configuration.
pub struct Config {
    pub database_url: String,
    pub broker: BrokerConfig,
    pub queue: QueueConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Broker settings fall back to local defaults; the database has no
    /// sensible default and is required.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let broker = BrokerConfig {
            host: env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("RABBITMQ_PORT")
                .unwrap_or_else(|_| "5672".to_string())
                .parse()?,
            username: env::var("RABBITMQ_USER").unwrap_or_else(|_| "guest".to_string()),
            password: env::var("RABBITMQ_PASS").unwrap_or_else(|_| "guest".to_string()),
            exchange: env::var("AMQP_EXCHANGE").unwrap_or_else(|_| "orderflow.events".to_string()),
            dead_letter_exchange: env::var("AMQP_DEAD_LETTER_EXCHANGE")
                .unwrap_or_else(|_| "orderflow.dlx".to_string()),
            ..BrokerConfig::default()
        };

        let queue = QueueConfig {
            queue: env::var("BILLING_QUEUE").unwrap_or_else(|_| "billing.orders".to_string()),
            dead_letter_queue: env::var("BILLING_DEAD_LETTER_QUEUE")
                .unwrap_or_else(|_| "billing.orders.dlq".to_string()),
            prefetch: env::var("BILLING_PREFETCH")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            ..QueueConfig::default()
        };

        Ok(Self {
            database_url,
            broker,
            queue,
        })
    }
}
