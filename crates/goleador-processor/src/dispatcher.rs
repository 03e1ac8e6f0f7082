//! Dispatch loop.
//!
//! Every iteration publishes a task for each video that is unfinished and
//! either never started or started more than `processing_gap` ago, then
//! records the new start time. There are no leases: a slow worker and a
//! re-dispatched one may both report, and the store keeps the last write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use goleador_models::{TaskMessage, VideoId};
use goleador_queue::{Broker, SharedChannel, TASK_QUEUE_NAME};
use goleador_store::VideoStore;

use crate::config::ProcessorConfig;
use crate::error::ProcessorResult;
use crate::metrics;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Counts from one dispatch iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub eligible: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct Dispatcher<B, S> {
    channel: SharedChannel<B>,
    store: Arc<S>,
    config: ProcessorConfig,
    clock: Clock,
}

impl<B: Broker, S: VideoStore> Dispatcher<B, S> {
    pub fn new(channel: SharedChannel<B>, store: Arc<S>, config: ProcessorConfig) -> Self {
        Self {
            channel,
            store,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. to step through hours of schedule in a
    /// test.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Dispatch forever, sleeping `dispatch_delay` between iterations.
    pub async fn run(&self) {
        info!(
            delay = ?self.config.dispatch_delay,
            gap = ?self.config.processing_gap,
            "Starting dispatch loop"
        );

        loop {
            // Failures are logged inside; the loop never stops on them
            if let Ok(summary) = self.dispatch_once().await {
                if summary.eligible > 0 {
                    debug!(
                        eligible = summary.eligible,
                        dispatched = summary.dispatched,
                        failed = summary.failed,
                        "Dispatch iteration finished"
                    );
                }
            }

            if !self.config.dispatch_delay.is_zero() {
                tokio::time::sleep(self.config.dispatch_delay).await;
            }
        }
    }

    /// Run one iteration.
    ///
    /// Eligibility is judged against the time the iteration starts. Each
    /// video's start time is read from the clock after its task was
    /// published, so a long batch does not shorten the staleness window of
    /// the videos published last.
    ///
    /// Returns an error only when the store query fails. Per-video failures
    /// are logged, counted in the summary and leave the video eligible.
    pub async fn dispatch_once(&self) -> ProcessorResult<DispatchSummary> {
        let cutoff = self.config.cutoff((self.clock)());

        let video_ids = match self.store.unprocessed_videos(cutoff).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(cutoff = %cutoff, "Can't process unprocessed videos: {}", e);
                metrics::record_dispatch_failure("query");
                return Err(e.into());
            }
        };

        let mut summary = DispatchSummary {
            eligible: video_ids.len(),
            ..DispatchSummary::default()
        };
        metrics::record_eligible(summary.eligible);

        for video_id in &video_ids {
            if self.dispatch_video(video_id).await {
                summary.dispatched += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    /// Publish one task and stamp its start time. Returns false on failure;
    /// the video then stays eligible for the next iteration.
    async fn dispatch_video(&self, video_id: &VideoId) -> bool {
        info!(video_id = %video_id, "Process unprocessed video");

        let task = TaskMessage::new(video_id.clone());
        if let Err(e) = self.channel.publish(TASK_QUEUE_NAME, &task.to_bytes()).await {
            error!(video_id = %video_id, "Error for unprocessed video: {}", e);
            metrics::record_dispatch_failure("publish");
            return false;
        }
        metrics::record_dispatched();

        let started_at = (self.clock)();
        if let Err(e) = self.store.update_processing_start_time(video_id, started_at).await {
            error!(video_id = %video_id, "Error for unprocessed video: {}", e);
            metrics::record_dispatch_failure("start_time");
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goleador_models::VideoState;
    use goleador_queue::MemoryBroker;
    use goleador_store::MemoryVideoStore;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn new(at: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(at)))
        }

        fn set(&self, at: DateTime<Utc>) {
            *self.0.lock().unwrap() = at;
        }

        fn clock(&self) -> Clock {
            let inner = Arc::clone(&self.0);
            Arc::new(move || *inner.lock().unwrap())
        }
    }

    async fn setup(
        ids: &[&str],
    ) -> (
        MemoryBroker,
        Arc<MemoryVideoStore>,
        Dispatcher<MemoryBroker, MemoryVideoStore>,
    ) {
        let broker = MemoryBroker::new();
        let channel = SharedChannel::new(broker.clone());
        channel.declare_queue(TASK_QUEUE_NAME).await.unwrap();

        let store = Arc::new(MemoryVideoStore::new());
        for id in ids {
            store.register_video(&VideoId::from(*id)).await.unwrap();
        }

        let dispatcher = Dispatcher::new(channel, Arc::clone(&store), ProcessorConfig::default());
        (broker, store, dispatcher)
    }

    #[tokio::test]
    async fn test_dispatches_registered_videos() {
        let (broker, store, dispatcher) = setup(&["a", "b"]).await;

        let summary = dispatcher.dispatch_once().await.unwrap();

        assert_eq!(
            summary,
            DispatchSummary {
                eligible: 2,
                dispatched: 2,
                failed: 0
            }
        );
        assert_eq!(broker.published(TASK_QUEUE_NAME), vec![b"a".to_vec(), b"b".to_vec()]);
        for job in store.jobs().await {
            assert_eq!(job.state(), VideoState::Dispatched);
        }
    }

    #[tokio::test]
    async fn test_fresh_dispatch_is_not_repeated() {
        let (broker, _store, dispatcher) = setup(&["a"]).await;
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let dispatcher = dispatcher.with_clock(clock.clock());

        dispatcher.dispatch_once().await.unwrap();
        clock.set(now + chrono::Duration::minutes(59));
        let summary = dispatcher.dispatch_once().await.unwrap();

        assert_eq!(summary.eligible, 0);
        assert_eq!(broker.published(TASK_QUEUE_NAME).len(), 1);
    }

    #[tokio::test]
    async fn test_stale_dispatch_is_repeated() {
        let (broker, store, dispatcher) = setup(&["a"]).await;
        let now = Utc::now();
        let later = now + chrono::Duration::minutes(61);
        let clock = ManualClock::new(now);
        let dispatcher = dispatcher.with_clock(clock.clock());

        dispatcher.dispatch_once().await.unwrap();
        clock.set(later);
        let summary = dispatcher.dispatch_once().await.unwrap();

        assert_eq!(summary.dispatched, 1);
        assert_eq!(broker.published(TASK_QUEUE_NAME).len(), 2);
        let job = store.get(&VideoId::from("a")).await.unwrap().unwrap();
        assert_eq!(job.processing_started_at, Some(later));
    }

    #[tokio::test]
    async fn test_start_time_is_taken_after_each_publish() {
        let (broker, store, dispatcher) = setup(&["a", "b", "c"]).await;
        let t0 = Utc::now();
        // Every publish takes ten minutes
        let published = broker.clone();
        let dispatcher = dispatcher.with_clock(Arc::new(move || {
            let count = published.published(TASK_QUEUE_NAME).len() as i64;
            t0 + chrono::Duration::minutes(10 * count)
        }));

        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.dispatched, 3);

        for (id, minutes) in [("a", 10), ("b", 20), ("c", 30)] {
            let job = store.get(&VideoId::from(id)).await.unwrap().unwrap();
            assert_eq!(
                job.processing_started_at,
                Some(t0 + chrono::Duration::minutes(minutes)),
                "start time of {}",
                id
            );
        }
    }

    #[tokio::test]
    async fn test_finished_videos_are_not_dispatched() {
        let (broker, store, dispatcher) = setup(&["a", "b"]).await;
        store.update_video_times(&VideoId::from("a"), &[12]).await.unwrap();
        store.update_error(&VideoId::from("b"), "no frames").await.unwrap();

        let summary = dispatcher.dispatch_once().await.unwrap();

        assert_eq!(summary, DispatchSummary::default());
        assert!(broker.published(TASK_QUEUE_NAME).is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_video_eligible() {
        let (broker, store, dispatcher) = setup(&["a", "b"]).await;
        broker.fail_next_publishes(1);
        let dispatcher = dispatcher.with_clock(ManualClock::new(Utc::now()).clock());

        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.dispatched, 1);

        let a = store.get(&VideoId::from("a")).await.unwrap().unwrap();
        assert_eq!(a.state(), VideoState::Registered);

        // Picked up again on the next iteration, without waiting for the gap
        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.eligible, 1);
        assert_eq!(summary.dispatched, 1);
        assert_eq!(broker.published(TASK_QUEUE_NAME), vec![b"b".to_vec(), b"a".to_vec()]);
    }

    #[tokio::test]
    async fn test_start_time_failure_keeps_video_eligible() {
        let (broker, store, dispatcher) = setup(&["a"]).await;
        store.fail_next_start_updates(1);
        let dispatcher = dispatcher.with_clock(ManualClock::new(Utc::now()).clock());

        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.failed, 1);

        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.dispatched, 1);
        // The task went out twice; processing it twice is harmless
        assert_eq!(broker.published(TASK_QUEUE_NAME).len(), 2);
    }

    #[tokio::test]
    async fn test_query_failure_is_reported() {
        let (broker, store, dispatcher) = setup(&["a"]).await;
        store.fail_next_queries(1);

        assert!(dispatcher.dispatch_once().await.is_err());
        assert!(broker.published(TASK_QUEUE_NAME).is_empty());

        let summary = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(summary.dispatched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_going_after_failures() {
        let (broker, store, dispatcher) = setup(&["a"]).await;
        store.fail_next_queries(2);

        let handle = tokio::spawn(async move { dispatcher.run().await });
        // Two failing iterations, then a successful one
        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        handle.abort();

        assert_eq!(broker.published(TASK_QUEUE_NAME), vec![b"a".to_vec()]);
    }
}
