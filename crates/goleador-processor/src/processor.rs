//! Processor wiring.

use std::sync::Arc;

use tracing::info;

use goleador_queue::{
    connect_with_retry, Broker, ConnectRetry, QueueConfig, RedisBroker, SharedChannel,
    RESULT_QUEUE_NAME, TASK_QUEUE_NAME,
};
use goleador_store::VideoStore;

use crate::collector::Collector;
use crate::config::ProcessorConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ProcessorResult;

/// Owns the broker channel and the store, and runs both loops over them.
pub struct Processor<B, S> {
    channel: SharedChannel<B>,
    store: Arc<S>,
    config: ProcessorConfig,
}

impl<S: VideoStore + 'static> Processor<RedisBroker, S> {
    /// Connect to the Redis broker, retrying until it accepts connections.
    pub async fn connect(
        queue_config: &QueueConfig,
        store: Arc<S>,
        config: ProcessorConfig,
    ) -> ProcessorResult<Self> {
        let retry = ConnectRetry::new("broker", queue_config.connect_retry_delay);
        let broker = connect_with_retry(&retry, || RedisBroker::connect(queue_config)).await?;
        Ok(Self::new(broker, store, config))
    }
}

impl<B: Broker + 'static, S: VideoStore + 'static> Processor<B, S> {
    pub fn new(broker: B, store: Arc<S>, config: ProcessorConfig) -> Self {
        Self {
            channel: SharedChannel::new(broker),
            store,
            config,
        }
    }

    /// Declare both queues, spawn the result consumer and run the dispatch
    /// loop. Only returns if queue declaration fails.
    pub async fn start(self) -> ProcessorResult<()> {
        info!("Start Processor");

        self.channel.declare_queue(TASK_QUEUE_NAME).await?;
        self.channel.declare_queue(RESULT_QUEUE_NAME).await?;

        let collector = Collector::new(
            self.channel.clone(),
            Arc::clone(&self.store),
            self.config.clone(),
        );
        let collector_handle = tokio::spawn(async move { collector.run().await });

        let dispatcher = Dispatcher::new(self.channel, self.store, self.config);
        dispatcher.run().await;

        collector_handle.abort();
        Ok(())
    }
}
