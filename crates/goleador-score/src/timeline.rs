//! Mapping goal frames onto the video timeline.

use serde::{Deserialize, Serialize};

use goleador_models::format_seconds;

/// Frame adjustments applied before a goal frame is shown to a viewer.
///
/// The defaults were tuned on broadcast footage: the frame dump starts with
/// two thumbnail frames, and jumping 15 frames before the scoreboard change
/// lands the viewer in the build-up rather than the celebration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameOffsets {
    /// Non-content frames at the start of the frame dump
    pub leading_thumbnails: u32,
    /// Frames to step back from the scoreboard change
    pub lead_in: u32,
}

impl Default for FrameOffsets {
    fn default() -> Self {
        Self {
            leading_thumbnails: 2,
            lead_in: 15,
        }
    }
}

impl FrameOffsets {
    /// Display frame for a goal frame, clamped at the start of the video.
    pub fn display_frame(&self, goal_frame: u32) -> u32 {
        goal_frame
            .saturating_sub(self.leading_thumbnails)
            .saturating_sub(self.lead_in)
    }
}

/// Converts a frame number into a human-readable timestamp.
pub trait TimestampFormatter: Send + Sync {
    fn format(&self, frame: u32) -> String;
}

/// Formats frames as `HH:MM:SS` given the rate frames were sampled at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRateFormatter {
    /// Analyzed frames per second of video
    pub fps: f64,
}

impl FrameRateFormatter {
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }

    pub fn seconds(&self, frame: u32) -> f64 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        f64::from(frame) / self.fps
    }
}

impl Default for FrameRateFormatter {
    fn default() -> Self {
        Self { fps: 1.0 }
    }
}

impl TimestampFormatter for FrameRateFormatter {
    fn format(&self, frame: u32) -> String {
        format_seconds(self.seconds(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_frame() {
        let offsets = FrameOffsets::default();
        assert_eq!(offsets.display_frame(50), 33);
        assert_eq!(offsets.display_frame(120), 103);
        assert_eq!(offsets.display_frame(17), 0);
        assert_eq!(offsets.display_frame(5), 0);
        assert_eq!(offsets.display_frame(0), 0);
    }

    #[test]
    fn test_custom_offsets() {
        let offsets = FrameOffsets {
            leading_thumbnails: 1,
            lead_in: 0,
        };
        assert_eq!(offsets.display_frame(50), 49);
    }

    #[test]
    fn test_frame_rate_formatter() {
        let one_per_second = FrameRateFormatter::default();
        assert_eq!(one_per_second.format(103), "00:01:43");

        let two_per_second = FrameRateFormatter::new(2.0);
        assert_eq!(two_per_second.format(7201), "01:00:00.500");
        assert_eq!(two_per_second.seconds(10), 5.0);
    }
}
