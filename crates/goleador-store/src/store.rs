//! Store contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use goleador_models::{VideoId, VideoJob};

use crate::error::StoreResult;

/// Persistent video metadata as seen by the processor.
///
/// Every operation is atomic on its own; callers do no extra locking.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Add a video so the dispatcher picks it up. Re-registering is a no-op.
    async fn register_video(&self, video_id: &VideoId) -> StoreResult<()>;

    /// Fetch the current record for a video.
    async fn get(&self, video_id: &VideoId) -> StoreResult<Option<VideoJob>>;

    /// Record goal times and finish the video. Last write wins.
    async fn update_video_times(&self, video_id: &VideoId, times: &[i64]) -> StoreResult<()>;

    /// Record a worker error and finish the video. Last write wins.
    async fn update_error(&self, video_id: &VideoId, message: &str) -> StoreResult<()>;

    /// Unfinished videos that were never started or started before `cutoff`.
    async fn unprocessed_videos(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<VideoId>>;

    /// Record when the latest task for a video was published.
    async fn update_processing_start_time(
        &self,
        video_id: &VideoId,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;
}
