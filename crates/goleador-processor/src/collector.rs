//! Result consumer.
//!
//! Workers report `<videoId>:<status>:<value>`. Every delivery is
//! acknowledged exactly once after handling, whether it was stored, ignored
//! or could not be decoded, so a poison message never blocks the queue.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use goleador_models::{ResultMessage, ResultStatus};
use goleador_queue::{Broker, Delivery, SharedChannel, RESULT_QUEUE_NAME};
use goleador_store::VideoStore;

use crate::config::ProcessorConfig;
use crate::metrics;

/// What happened to one result message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    /// Times or error persisted
    Stored,
    /// Unknown status; nothing persisted
    Ignored,
    /// Decoding or persisting failed
    Dropped(String),
}

pub struct Collector<B, S> {
    channel: SharedChannel<B>,
    store: Arc<S>,
    config: ProcessorConfig,
}

impl<B: Broker, S: VideoStore> Collector<B, S> {
    pub fn new(channel: SharedChannel<B>, store: Arc<S>, config: ProcessorConfig) -> Self {
        Self {
            channel,
            store,
            config,
        }
    }

    /// Poll the result queue forever.
    pub async fn run(&self) {
        info!(queue = RESULT_QUEUE_NAME, "Starting result consumer");

        loop {
            match self.poll_once().await {
                Ok(0) | Err(_) => tokio::time::sleep(self.config.result_poll_interval).await,
                Ok(_) => {}
            }
        }
    }

    /// Fetch and handle one batch. Returns the number of deliveries handled.
    pub async fn poll_once(&self) -> goleador_queue::QueueResult<usize> {
        let deliveries = self
            .channel
            .fetch(RESULT_QUEUE_NAME, self.config.result_batch_size)
            .await
            .map_err(|e| {
                warn!("Failed to fetch results: {}", e);
                e
            })?;

        let count = deliveries.len();
        for delivery in deliveries {
            self.handle_delivery(delivery).await;
        }
        Ok(count)
    }

    /// Handle one result, then acknowledge it.
    pub async fn handle_delivery(&self, delivery: Delivery) -> ResultOutcome {
        let outcome = self.handle_body(&delivery.body).await;

        match &outcome {
            ResultOutcome::Dropped(reason) => {
                error!(tag = %delivery.tag, "Response error: {}", reason);
                metrics::record_dropped();
            }
            ResultOutcome::Ignored | ResultOutcome::Stored => {}
        }

        if let Err(e) = self.channel.ack(RESULT_QUEUE_NAME, &delivery.tag).await {
            error!(tag = %delivery.tag, "Failed to ack result: {}", e);
        }

        outcome
    }

    async fn handle_body(&self, body: &[u8]) -> ResultOutcome {
        let message = match ResultMessage::parse(body) {
            Ok(message) => message,
            Err(e) => return ResultOutcome::Dropped(e.to_string()),
        };
        info!(result = %message, "Received result");
        metrics::record_result(&message.status);

        let stored = match &message.status {
            ResultStatus::Ok => match message.times() {
                Ok(times) => self.store.update_video_times(&message.video_id, &times).await,
                Err(e) => return ResultOutcome::Dropped(e.to_string()),
            },
            ResultStatus::Error => {
                self.store
                    .update_error(&message.video_id, &message.value)
                    .await
            }
            ResultStatus::Other(status) => {
                debug!(video_id = %message.video_id, status = %status, "Ignoring result");
                return ResultOutcome::Ignored;
            }
        };

        match stored {
            Ok(()) => ResultOutcome::Stored,
            Err(e) => ResultOutcome::Dropped(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goleador_models::{VideoId, VideoOutcome, VideoState};
    use goleador_queue::{MemoryBroker, TASK_QUEUE_NAME};
    use goleador_store::MemoryVideoStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    use crate::dispatcher::Dispatcher;

    struct Harness {
        broker: MemoryBroker,
        channel: SharedChannel<MemoryBroker>,
        store: Arc<MemoryVideoStore>,
        collector: Collector<MemoryBroker, MemoryVideoStore>,
    }

    async fn harness() -> Harness {
        let broker = MemoryBroker::new();
        let channel = SharedChannel::new(broker.clone());
        channel.declare_queue(TASK_QUEUE_NAME).await.unwrap();
        channel.declare_queue(RESULT_QUEUE_NAME).await.unwrap();
        let store = Arc::new(MemoryVideoStore::new());
        let collector = Collector::new(channel.clone(), Arc::clone(&store), ProcessorConfig::default());
        Harness {
            broker,
            channel,
            store,
            collector,
        }
    }

    impl Harness {
        async fn deliver(&self, body: &[u8]) -> ResultOutcome {
            self.channel.publish(RESULT_QUEUE_NAME, body).await.unwrap();
            let mut deliveries = self.channel.fetch(RESULT_QUEUE_NAME, 1).await.unwrap();
            let delivery = deliveries.pop().unwrap();
            self.collector.handle_delivery(delivery).await
        }
    }

    #[tokio::test]
    async fn test_ok_result_stores_times() {
        let h = harness().await;
        let id = VideoId::from("v1");
        h.store.register_video(&id).await.unwrap();

        assert_eq!(h.deliver(b"v1:ok:33,103").await, ResultOutcome::Stored);

        let job = h.store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.times(), Some(&[33, 103][..]));
        assert_eq!(h.broker.acked(RESULT_QUEUE_NAME), 1);
    }

    #[tokio::test]
    async fn test_ok_without_value_stores_no_times() {
        let h = harness().await;

        assert_eq!(h.deliver(b"v1:ok").await, ResultOutcome::Stored);
        assert_eq!(h.deliver(b"v2:ok:").await, ResultOutcome::Stored);

        let job = h.store.get(&VideoId::from("v1")).await.unwrap().unwrap();
        assert_eq!(job.outcome, Some(VideoOutcome::Done { times: vec![] }));
    }

    #[tokio::test]
    async fn test_error_result_stores_message() {
        let h = harness().await;

        assert_eq!(
            h.deliver(b"v1:error:pipeline exited: code 1").await,
            ResultOutcome::Stored
        );

        let job = h.store.get(&VideoId::from("v1")).await.unwrap().unwrap();
        assert_eq!(job.state(), VideoState::Failed);
        assert_eq!(
            job.outcome,
            Some(VideoOutcome::Failed {
                error: "pipeline exited: code 1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_status_is_ignored_and_acked() {
        let h = harness().await;

        assert_eq!(h.deliver(b"v1:progress:50").await, ResultOutcome::Ignored);

        assert!(h.store.get(&VideoId::from("v1")).await.unwrap().is_none());
        assert_eq!(h.broker.acked(RESULT_QUEUE_NAME), 1);
        assert_eq!(h.broker.in_flight(RESULT_QUEUE_NAME), 0);
    }

    #[tokio::test]
    async fn test_malformed_results_are_dropped_and_acked() {
        let h = harness().await;

        let bodies: [&[u8]; 4] = [b"no-separator", b":ok:1", b"v1:ok:1,two", &[0xff, 0x00]];
        for body in bodies {
            assert!(matches!(h.deliver(body).await, ResultOutcome::Dropped(_)));
        }

        assert!(h.store.jobs().await.is_empty());
        assert_eq!(h.broker.acked(RESULT_QUEUE_NAME), 4);
        assert_eq!(h.broker.in_flight(RESULT_QUEUE_NAME), 0);
    }

    #[tokio::test]
    async fn test_poll_once_acks_each_delivery_once() {
        let h = harness().await;
        let bodies: [&[u8]; 4] = [b"a:ok:1", b"garbage", b"b:unknown", b"c:error:boom"];
        for body in bodies {
            h.channel.publish(RESULT_QUEUE_NAME, body).await.unwrap();
        }

        assert_eq!(h.collector.poll_once().await.unwrap(), 4);
        assert_eq!(h.collector.poll_once().await.unwrap(), 0);

        assert_eq!(h.broker.acked(RESULT_QUEUE_NAME), 4);
        assert_eq!(h.broker.in_flight(RESULT_QUEUE_NAME), 0);
    }

    #[tokio::test]
    async fn test_redispatch_is_idempotent() {
        let h = harness().await;
        let id = VideoId::from("v1");
        h.store.register_video(&id).await.unwrap();

        let now = chrono::Utc::now();
        let hours = Arc::new(AtomicI64::new(0));
        let offset = Arc::clone(&hours);
        let dispatcher = Dispatcher::new(h.channel.clone(), Arc::clone(&h.store), ProcessorConfig::default())
            .with_clock(Arc::new(move || {
                now + chrono::Duration::hours(offset.load(Ordering::SeqCst))
            }));

        // Worker is slow: the video goes stale and is dispatched again
        dispatcher.dispatch_once().await.unwrap();
        hours.store(2, Ordering::SeqCst);
        dispatcher.dispatch_once().await.unwrap();
        assert_eq!(h.broker.published(TASK_QUEUE_NAME).len(), 2);

        // Both workers eventually report the same result
        assert_eq!(h.deliver(b"v1:ok:33,103").await, ResultOutcome::Stored);
        assert_eq!(h.deliver(b"v1:ok:33,103").await, ResultOutcome::Stored);

        let job = h.store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.times(), Some(&[33, 103][..]));
        hours.store(10, Ordering::SeqCst);
        assert!(h
            .store
            .unprocessed_videos(now + chrono::Duration::hours(10))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(dispatcher.dispatch_once().await.unwrap().eligible, 0);
    }
}
