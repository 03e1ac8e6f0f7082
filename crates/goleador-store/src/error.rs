//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid record for {video_id}: {reason}")]
    InvalidRecord { video_id: String, reason: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn invalid_record(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            video_id: video_id.into(),
            reason: reason.into(),
        }
    }
}
