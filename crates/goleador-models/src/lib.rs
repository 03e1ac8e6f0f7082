//! Shared data models for Goleador.
//!
//! This crate provides:
//! - Interned scoreboard values (`ScoreValue` / `ScoreTable`)
//! - Video job lifecycle types
//! - Task and result message codec for the queues
//! - Timestamp formatting helpers

pub mod error;
pub mod message;
pub mod score;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use message::{format_times, parse_times, ResultMessage, ResultStatus, TaskMessage};
pub use score::{FrameReading, ScoreTable, ScoreValue, CACHE_DIMENSION};
pub use timestamp::format_seconds;
pub use video::{VideoId, VideoJob, VideoOutcome, VideoState};
