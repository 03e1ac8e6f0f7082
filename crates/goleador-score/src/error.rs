//! Score extraction error types.

use std::path::PathBuf;

use thiserror::Error;

pub type ScoreResult<T> = Result<T, ScoreError>;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Frame directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
