//! Goal detection from OCR'd scoreboard text.
//!
//! This crate provides:
//! - `ScoreParser`: finds a score in one frame's noisy OCR text
//! - `GoalDetector`: turns ordered readings into goal-event frames
//! - `GoalTimestampExtractor`: goal frames to display frames and timestamps
//! - Frame directory loading and report files

pub mod detector;
pub mod error;
pub mod extractor;
pub mod frames;
pub mod parser;
pub mod timeline;

pub use detector::{GoalDetector, Transition};
pub use error::{ScoreError, ScoreResult};
pub use extractor::{GoalReport, GoalTimestampExtractor};
pub use frames::{process_directory, FrameDirectory, SCORE_FRAMES_FILE};
pub use parser::ScoreParser;
pub use timeline::{FrameOffsets, FrameRateFormatter, TimestampFormatter};
