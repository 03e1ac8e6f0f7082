//! Processor binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use goleador_processor::{Processor, ProcessorConfig};
use goleador_queue::QueueConfig;
use goleador_store::{RedisVideoStore, StoreConfig};

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    if let Err(e) = run().await {
        error!("Processor error: {:#}", e);
        std::process::exit(1);
    }

    info!("Processor shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    info!("Starting goleador-processor");

    let config = ProcessorConfig::from_env();
    config.validate()?;
    info!("Processor config: {:?}", config);

    let queue_config = QueueConfig::from_env();
    let store_config = StoreConfig::from_env();

    let store = RedisVideoStore::connect(&store_config)
        .await
        .context("Failed to connect to video store")?;
    let processor = Processor::connect(&queue_config, Arc::new(store), config).await?;

    tokio::select! {
        result = processor.start() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    Ok(())
}
