//! Standalone worker: connects to the database, wires the default consumer
//! registry onto the in-process queue and drains it until shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom::config::AppConfig;
use stockroom::consumers::{run_consumer_loop, ConsumerRegistry};
use stockroom::db;
use stockroom::events::{process_events, EventSender};
use stockroom::message_queue::InMemoryMessageQueue;
use stockroom::resolvers::{InMemoryOrderGateway, PassthroughVariantResolver};
use stockroom::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(environment = %config.environment, "starting stockroom worker");

    let conn = db::connect(&config)
        .await
        .context("failed to connect to database")?;
    if config.auto_migrate {
        db::run_migrations(&conn)
            .await
            .context("failed to run migrations")?;
    }

    let (event_tx, event_rx) = mpsc::channel(config.queue_capacity);
    tokio::spawn(process_events(event_rx));

    let queue = Arc::new(InMemoryMessageQueue::with_max_size(config.queue_capacity));
    let state = AppState::new(
        Arc::new(conn),
        config,
        EventSender::new(event_tx),
        Arc::new(PassthroughVariantResolver),
        Arc::new(InMemoryOrderGateway::new()),
        queue,
    );

    let registry = Arc::new(ConsumerRegistry::with_default_consumers());
    let consumer = tokio::spawn(run_consumer_loop(state.context.clone(), registry));

    tokio::select! {
        result = consumer => {
            result.context("consumer loop panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, stopping worker");
        }
    }

    Ok(())
}
