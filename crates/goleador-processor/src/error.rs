//! Processor error types.

use thiserror::Error;

pub type ProcessorResult<T> = Result<T, ProcessorError>;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue error: {0}")]
    Queue(#[from] goleador_queue::QueueError),

    #[error("Store error: {0}")]
    Store(#[from] goleador_store::StoreError),
}

impl ProcessorError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
