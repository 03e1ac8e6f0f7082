//! Per-video lifecycle logging.
//!
//! One `VideoLogger` follows a video through frame extraction and goal
//! detection. Events carry the video id and the milliseconds since the task
//! was picked up, so a slow OCR stage shows up without extra timers.

use std::path::Path;
use std::time::Instant;

use tracing::{error, info, warn, Span};

use goleador_models::VideoId;
use goleador_score::GoalReport;

use crate::error::WorkerError;

#[derive(Debug)]
pub struct VideoLogger {
    video_id: VideoId,
    started: Instant,
}

impl VideoLogger {
    pub fn new(video_id: &VideoId) -> Self {
        Self {
            video_id: video_id.clone(),
            started: Instant::now(),
        }
    }

    /// Span for the whole extraction. Pipeline and frame-directory logs
    /// emitted inside it inherit the video id.
    pub fn span(&self) -> Span {
        tracing::info_span!("goal_extraction", video_id = %self.video_id)
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn extracting_frames(&self, frames_dir: &Path) {
        info!(
            video_id = %self.video_id,
            frames_dir = %frames_dir.display(),
            "Extracting frames"
        );
    }

    pub fn frames_extracted(&self, frames_dir: &Path) {
        info!(
            video_id = %self.video_id,
            frames_dir = %frames_dir.display(),
            elapsed_ms = self.elapsed_ms(),
            "Frames extracted"
        );
    }

    /// Log the extraction result. A video without goals is logged as a
    /// warning: it usually means the scoreboard was never read.
    pub fn goals_found(&self, report: &GoalReport) {
        if report.is_empty() {
            warn!(
                video_id = %self.video_id,
                elapsed_ms = self.elapsed_ms(),
                "No goals found"
            );
            return;
        }
        info!(
            video_id = %self.video_id,
            goals = report.goal_frames.len(),
            timestamps = %report.timestamps.join(","),
            elapsed_ms = self.elapsed_ms(),
            "Goals found"
        );
    }

    pub fn failed(&self, error: &WorkerError) {
        error!(
            video_id = %self.video_id,
            elapsed_ms = self.elapsed_ms(),
            error = %error,
            "Goal extraction failed"
        );
    }
}
