//! Lock-guarded broker channel.
//!
//! The processor publishes tasks from its dispatch loop while the result
//! consumer fetches and acknowledges on another task. Both go through one
//! `SharedChannel`, and every operation holds the lock for its duration.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::broker::{Broker, Delivery};
use crate::error::QueueResult;

pub struct SharedChannel<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> Clone for SharedChannel<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Broker> SharedChannel<B> {
    pub fn new(broker: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(broker)),
        }
    }

    pub async fn declare_queue(&self, queue: &str) -> QueueResult<()> {
        let mut broker = self.inner.lock().await;
        broker.declare_queue(queue).await
    }

    pub async fn publish(&self, queue: &str, body: &[u8]) -> QueueResult<String> {
        let mut broker = self.inner.lock().await;
        let id = broker.publish(queue, body).await?;
        debug!(queue = %queue, message_id = %id, "Published message");
        Ok(id)
    }

    pub async fn fetch(&self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>> {
        let mut broker = self.inner.lock().await;
        broker.fetch(queue, max).await
    }

    pub async fn ack(&self, queue: &str, tag: &str) -> QueueResult<()> {
        let mut broker = self.inner.lock().await;
        broker.ack(queue, tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts operations that start while another one is still running.
    #[derive(Clone, Default)]
    struct OverlapDetector {
        inner: MemoryBroker,
        busy: Arc<AtomicBool>,
        overlaps: Arc<AtomicUsize>,
    }

    impl OverlapDetector {
        async fn enter(&self) {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            tokio::task::yield_now().await;
        }

        async fn leave(&self) {
            tokio::task::yield_now().await;
            self.busy.store(false, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Broker for OverlapDetector {
        async fn declare_queue(&mut self, queue: &str) -> QueueResult<()> {
            self.enter().await;
            let result = self.inner.declare_queue(queue).await;
            self.leave().await;
            result
        }

        async fn publish(&mut self, queue: &str, body: &[u8]) -> QueueResult<String> {
            self.enter().await;
            let result = self.inner.publish(queue, body).await;
            self.leave().await;
            result
        }

        async fn fetch(&mut self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>> {
            self.enter().await;
            let result = self.inner.fetch(queue, max).await;
            self.leave().await;
            result
        }

        async fn ack(&mut self, queue: &str, tag: &str) -> QueueResult<()> {
            self.enter().await;
            let result = self.inner.ack(queue, tag).await;
            self.leave().await;
            result
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_operations_never_overlap() {
        let detector = OverlapDetector::default();
        let channel = SharedChannel::new(detector.clone());
        channel.declare_queue("q").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let channel = channel.clone();
            handles.push(tokio::spawn(async move {
                channel.publish("q", format!("m{}", i).as_bytes()).await.unwrap();
                for delivery in channel.fetch("q", 1).await.unwrap() {
                    channel.ack("q", &delivery.tag).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(detector.overlaps.load(Ordering::SeqCst), 0);
        assert_eq!(detector.inner.published("q").len(), 16);
        assert_eq!(detector.inner.acked("q"), 16);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_detector_sees_unguarded_overlap() {
        // Without the channel, concurrent callers do overlap
        let detector = OverlapDetector::default();
        let mut setup = detector.clone();
        setup.declare_queue("q").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let mut broker = detector.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..20 {
                    broker.publish("q", format!("m{}", i).as_bytes()).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(detector.overlaps.load(Ordering::SeqCst) > 0);
    }
}
