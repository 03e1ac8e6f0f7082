//! Goal detection state machine.
//!
//! OCR readings are noisy: digits get misread, frames show replays of old
//! scores, and some frames show no scoreboard at all. The detector only
//! trusts readings that are a legal successor of the last accepted score,
//! i.e. the same score or one more goal for exactly one side. Everything
//! else is dropped as noise without touching the state.

use goleador_models::{FrameReading, ScoreValue};

/// What a single reading did to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No score in the frame
    Skipped,
    /// Accepted, score unchanged
    Unchanged,
    /// Accepted, one side scored
    Goal,
    /// Not a legal successor; discarded
    Rejected,
}

/// Tracks the accepted score across frames. Every match starts at 0-0.
#[derive(Debug, Clone)]
pub struct GoalDetector {
    current: ScoreValue,
    goal_frames: Vec<u32>,
}

impl GoalDetector {
    /// Detector at kickoff (0-0) with no goals seen.
    pub fn new() -> Self {
        Self {
            current: ScoreValue::kickoff(),
            goal_frames: Vec::new(),
        }
    }

    /// Last accepted score.
    pub fn current(&self) -> ScoreValue {
        self.current
    }

    /// Goal-event frames seen so far, in observation order.
    pub fn goal_frames(&self) -> &[u32] {
        &self.goal_frames
    }

    /// Feed one reading. Readings must arrive in ascending frame order.
    pub fn observe(&mut self, reading: &FrameReading) -> Transition {
        let Some(score) = reading.score.as_deref() else {
            return Transition::Skipped;
        };

        let left_same = score.left == self.current.left;
        let left_up = score.left == self.current.left + 1;
        let right_same = score.right == self.current.right;
        let right_up = score.right == self.current.right + 1;

        if left_same && right_same {
            Transition::Unchanged
        } else if (left_up && right_same) || (left_same && right_up) {
            self.current = *score;
            self.goal_frames.push(reading.frame);
            Transition::Goal
        } else {
            Transition::Rejected
        }
    }

    /// Run the detector over `readings` and return the goal-event frames.
    pub fn goal_frames_of<'a>(readings: impl IntoIterator<Item = &'a FrameReading>) -> Vec<u32> {
        let mut detector = Self::new();
        for reading in readings {
            detector.observe(reading);
        }
        detector.goal_frames
    }
}

impl Default for GoalDetector {
    fn default() -> Self {
        Self::new()
    }
}
