//! In-memory video store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use goleador_models::{VideoId, VideoJob};

use crate::error::{StoreError, StoreResult};
use crate::store::VideoStore;

/// Store keeping every job in a map, ordered by video id.
#[derive(Debug, Default)]
pub struct MemoryVideoStore {
    jobs: RwLock<BTreeMap<VideoId, VideoJob>>,
    failing_start_updates: AtomicUsize,
    failing_queries: AtomicUsize,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` start-time updates fail.
    pub fn fail_next_start_updates(&self, count: usize) {
        self.failing_start_updates.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` unprocessed-video queries fail.
    pub fn fail_next_queries(&self, count: usize) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    /// Snapshot of every stored job.
    pub async fn jobs(&self) -> Vec<VideoJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn register_video(&self, video_id: &VideoId) -> StoreResult<()> {
        self.jobs
            .write()
            .await
            .entry(video_id.clone())
            .or_insert_with(|| VideoJob::new(video_id.clone()));
        Ok(())
    }

    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<VideoJob>> {
        Ok(self.jobs.read().await.get(video_id).cloned())
    }

    async fn update_video_times(&self, video_id: &VideoId, times: &[i64]) -> StoreResult<()> {
        self.jobs
            .write()
            .await
            .entry(video_id.clone())
            .or_insert_with(|| VideoJob::new(video_id.clone()))
            .complete(times.to_vec());
        Ok(())
    }

    async fn update_error(&self, video_id: &VideoId, message: &str) -> StoreResult<()> {
        self.jobs
            .write()
            .await
            .entry(video_id.clone())
            .or_insert_with(|| VideoJob::new(video_id.clone()))
            .fail(message);
        Ok(())
    }

    async fn unprocessed_videos(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<VideoId>> {
        if Self::take_failure(&self.failing_queries) {
            return Err(StoreError::unavailable("injected query failure"));
        }
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_eligible(cutoff))
            .map(|job| job.video_id.clone())
            .collect())
    }

    async fn update_processing_start_time(
        &self,
        video_id: &VideoId,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if Self::take_failure(&self.failing_start_updates) {
            return Err(StoreError::unavailable("injected update failure"));
        }
        self.jobs
            .write()
            .await
            .entry(video_id.clone())
            .or_insert_with(|| VideoJob::new(video_id.clone()))
            .mark_dispatched(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use goleador_models::VideoState;

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let store = MemoryVideoStore::new();
        let id = VideoId::from("v1");

        store.register_video(&id).await.unwrap();
        store.update_processing_start_time(&id, Utc::now()).await.unwrap();
        store.register_video(&id).await.unwrap();

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.state(), VideoState::Dispatched);
    }

    #[tokio::test]
    async fn test_unprocessed_selection() {
        let store = MemoryVideoStore::new();
        let now = Utc::now();
        let cutoff = now - Duration::hours(1);

        for id in ["new", "recent", "stale", "done", "failed"] {
            store.register_video(&VideoId::from(id)).await.unwrap();
        }
        store
            .update_processing_start_time(&VideoId::from("recent"), now - Duration::minutes(1))
            .await
            .unwrap();
        store
            .update_processing_start_time(&VideoId::from("stale"), now - Duration::hours(3))
            .await
            .unwrap();
        store.update_video_times(&VideoId::from("done"), &[1]).await.unwrap();
        store.update_error(&VideoId::from("failed"), "boom").await.unwrap();

        let ids = store.unprocessed_videos(cutoff).await.unwrap();
        assert_eq!(ids, vec![VideoId::from("new"), VideoId::from("stale")]);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryVideoStore::new();
        let id = VideoId::from("v1");

        store.update_video_times(&id, &[10, 20]).await.unwrap();
        store.update_video_times(&id, &[33]).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().times(), Some(&[33][..]));

        store.update_error(&id, "late failure").await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().state(), VideoState::Failed);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryVideoStore::new();
        let id = VideoId::from("v1");
        store.fail_next_start_updates(1);
        store.fail_next_queries(1);

        assert!(store.update_processing_start_time(&id, Utc::now()).await.is_err());
        assert!(store.update_processing_start_time(&id, Utc::now()).await.is_ok());
        assert!(store.unprocessed_videos(Utc::now()).await.is_err());
        assert!(store.unprocessed_videos(Utc::now()).await.is_ok());
    }
}
