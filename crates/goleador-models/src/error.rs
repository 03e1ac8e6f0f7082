//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Invalid goal time '{value}': {source}")]
    InvalidTime {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

impl ModelError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }
}
