//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid video id '{0}'")]
    InvalidVideoId(String),

    #[error("Pipeline failed: {0}")]
    PipelineFailed(String),

    #[error("Pipeline timed out after {0} seconds")]
    Timeout(u64),

    #[error("Score error: {0}")]
    Score(#[from] goleador_score::ScoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] goleador_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn pipeline_failed(msg: impl Into<String>) -> Self {
        Self::PipelineFailed(msg.into())
    }
}
