//! Configuration loading from environment.

use std::env;

use orderflow_broker::BrokerConfig;

/// Order service configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub broker: BrokerConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

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

        Ok(Self {
            port,
            database_url,
            broker,
        })
    }
}
