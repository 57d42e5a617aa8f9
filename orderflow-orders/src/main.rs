//! # Orderflow Orders
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter
//! - Connect to the broker and create the publisher
//! - Start the HTTP server

mod config;
mod http;
mod service;

#[cfg(test)]
mod service_tests;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderflow_broker::{AmqpPublisher, Broker};
use orderflow_store::build_store;

use crate::http::HttpServer;
use crate::service::OrderService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,orderflow_orders=debug,orderflow_broker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting orders server on port {}", config.port);
    tracing::info!("Using database: {}", config.database_url);

    // Build store (handles connection and migration)
    let store = build_store(&config.database_url).await?;

    // Connect to the broker; fatal configuration problems stop us here.
    let broker = Arc::new(Broker::connect(config.broker.clone()).await?);
    let publisher = Arc::new(AmqpPublisher::new(broker.clone()).await?);

    // Create the order service
    let service = OrderService::new(store, publisher.clone());

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    // Channel then connection are closed even when the server exits with
    // an error, before that error propagates.
    let run_result = server.run(&addr).await;

    publisher.close().await;
    broker.close().await;
    run_result?;

    tracing::info!("Orders server stopped");
    Ok(())
}
