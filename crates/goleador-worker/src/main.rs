//! Worker binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use goleador_queue::{connect_with_retry, ConnectRetry, QueueConfig, RedisBroker, SharedChannel};
use goleador_worker::{CommandPipeline, JobExecutor, WorkerConfig};

/// Used when `RUST_LOG` is unset. Keeps the worker's own debug lines
/// (published results, pipeline commands) but not per-frame scores.
const DEFAULT_LOG_FILTER: &str = "info,goleador_worker=debug";

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
        error!("Worker error: {:#}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    info!("Starting goleador-worker");

    let config = WorkerConfig::from_env();
    config.validate()?;
    info!("Worker config: {:?}", config);

    let queue_config = QueueConfig::from_env().with_consumer_name(config.consumer_name.clone());
    let retry = ConnectRetry::new("broker", queue_config.connect_retry_delay);
    let broker = connect_with_retry(&retry, || RedisBroker::connect(&queue_config)).await?;

    let command = config
        .pipeline_cmd
        .clone()
        .context("WORKER_PIPELINE_CMD is not set")?;
    let pipeline = Arc::new(CommandPipeline::new(command, config.pipeline_timeout));
    let executor = JobExecutor::new(config, SharedChannel::new(broker), pipeline);

    tokio::select! {
        result = executor.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
    }

    Ok(())
}
