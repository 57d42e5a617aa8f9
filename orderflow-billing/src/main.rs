//! # Orderflow Billing
//!
//! Worker binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store adapter and reconcile stale payments
//! - Connect to the broker
//! - Consume `order_created` events until shutdown

mod config;
mod gateway;
mod processor;

#[cfg(test)]
mod processor_tests;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderflow_broker::{AmqpPublisher, Broker, QueueConsumer};
use orderflow_store::build_store;
use orderflow_types::{OrderCreatedEvent, PaymentRepository};

use crate::gateway::AutoApproveGateway;
use crate::processor::PaymentProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,orderflow_billing=debug,orderflow_broker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting billing worker");
    tracing::info!("Using database: {}", config.database_url);

    // Build store (handles connection and migration)
    let store = Arc::new(build_store(&config.database_url).await?);

    // A crash mid-settlement leaves `processing` rows behind; settle them
    // as failed before taking new work.
    let reconciled = store.fail_stale_processing().await?;
    if reconciled > 0 {
        tracing::warn!(count = reconciled, "Marked stale processing payments as failed");
    }

    // Connect to the broker; fatal configuration problems stop us here.
    let broker = Arc::new(Broker::connect(config.broker.clone()).await?);
    let publisher = Arc::new(AmqpPublisher::new(broker.clone()).await?);

    let processor = PaymentProcessor::new(store, publisher.clone(), AutoApproveGateway);
    let consumer = QueueConsumer::<OrderCreatedEvent, _>::new(
        broker.clone(),
        config.queue.clone(),
        processor,
    );

    // Channel then connection are closed even when the consumer stops on
    // a fatal broker error, before that error propagates.
    let run_result = consumer.run(shutdown_signal()).await;

    publisher.close().await;
    broker.close().await;
    run_result?;

    tracing::info!("Billing worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
