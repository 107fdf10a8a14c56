//! Currency Ledger service
//!
//! Consumes shop and guild reservation requests from Kafka, settles them
//! against the Postgres ledger and publishes the replies.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use currency_ledger::ledger::PgLedgerStore;
use currency_ledger::messaging::{EventEmitter, KafkaConsumer, KafkaPublisher, Topics};
use currency_ledger::{db, Config, Dispatcher};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "currency_ledger=debug,rdkafka=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.is_production());

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "Starting currency ledger"
    );
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let topics = Topics::new(
        &config.service_name,
        config.telemetry_topic_prefix.as_deref(),
        config.telemetry_topic_version,
    );

    let publisher = KafkaPublisher::new(&config.kafka)?;
    let mut consumer = KafkaConsumer::new(&config.kafka, &topics.subscriptions())?;

    let store = PgLedgerStore::new(pool.clone());
    let emitter = EventEmitter::new(Arc::new(publisher), topics);
    let dispatcher = Dispatcher::new(Arc::new(store), emitter);

    dispatcher.run(&mut consumer, shutdown_signal()).await;

    // Cleanup
    tracing::info!("Consumer stopped, shutting down...");
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
