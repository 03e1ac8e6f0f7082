//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Queue not declared: {0}")]
    QueueNotDeclared(String),

    #[error("Publish failed: {0}")]
    PublishFailed(String),

    #[error("Unknown delivery tag {tag} on {queue}")]
    UnknownDelivery { queue: String, tag: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl QueueError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    pub fn publish_failed(msg: impl Into<String>) -> Self {
        Self::PublishFailed(msg.into())
    }

    /// Check if the broker could not be reached at all.
    ///
    /// Only these errors are retried while connecting; a bad URL or a
    /// protocol error fails immediately.
    pub fn is_connection_error(&self) -> bool {
        match self {
            QueueError::ConnectionFailed(_) => true,
            QueueError::Redis(e) => e.is_connection_refusal() || e.is_io_error() || e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_classification() {
        assert!(QueueError::connection_failed("refused").is_connection_error());
        assert!(!QueueError::publish_failed("nope").is_connection_error());
        assert!(!QueueError::QueueNotDeclared("task_queue".into()).is_connection_error());
    }
}
