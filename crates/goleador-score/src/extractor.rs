//! Goal timestamps from an ordered stream of frame readings.

use std::collections::BTreeMap;

use serde::Serialize;

use goleador_models::FrameReading;

use crate::detector::GoalDetector;
use crate::error::ScoreResult;
use crate::timeline::{FrameOffsets, FrameRateFormatter, TimestampFormatter};

/// Everything derived from one video's readings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalReport {
    /// Frames at which the accepted score advanced
    pub goal_frames: Vec<u32>,
    /// Goal frames shifted back to where a viewer should start watching
    pub display_frames: Vec<u32>,
    /// `display_frames` formatted for humans
    pub timestamps: Vec<String>,
}

impl GoalReport {
    pub fn is_empty(&self) -> bool {
        self.goal_frames.is_empty()
    }

    /// Display frames as the integer offsets reported to the processor.
    pub fn display_offsets(&self) -> Vec<i64> {
        self.display_frames.iter().map(|&f| i64::from(f)).collect()
    }

    /// Pretty-printed JSON, as printed by the command line tool.
    pub fn to_json_pretty(&self) -> ScoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct GoalTimestampExtractor<F: TimestampFormatter = FrameRateFormatter> {
    offsets: FrameOffsets,
    formatter: F,
}

impl GoalTimestampExtractor<FrameRateFormatter> {
    /// Extractor formatting display frames at one frame per second.
    pub fn new(offsets: FrameOffsets) -> Self {
        Self::with_formatter(offsets, FrameRateFormatter::default())
    }
}

impl Default for GoalTimestampExtractor<FrameRateFormatter> {
    fn default() -> Self {
        Self::new(FrameOffsets::default())
    }
}

impl<F: TimestampFormatter> GoalTimestampExtractor<F> {
    pub fn with_formatter(offsets: FrameOffsets, formatter: F) -> Self {
        Self { offsets, formatter }
    }

    /// Run goal detection over `readings`.
    ///
    /// Readings may arrive in any order; they are sorted by frame first and
    /// a later reading for an already seen frame replaces the earlier one.
    pub fn extract(&self, readings: impl IntoIterator<Item = FrameReading>) -> GoalReport {
        let ordered: BTreeMap<u32, FrameReading> = readings
            .into_iter()
            .map(|reading| (reading.frame, reading))
            .collect();

        let goal_frames = GoalDetector::goal_frames_of(ordered.values());
        let display_frames: Vec<u32> = goal_frames
            .iter()
            .map(|&frame| self.offsets.display_frame(frame))
            .collect();
        let timestamps = display_frames
            .iter()
            .map(|&frame| self.formatter.format(frame))
            .collect();

        GoalReport {
            goal_frames,
            display_frames,
            timestamps,
        }
    }
}
