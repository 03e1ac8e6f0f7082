//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use goleador_score::FrameOffsets;
use uuid::Uuid;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shell command that extracts and OCRs the frames of one video
    pub pipeline_cmd: Option<String>,
    /// Pipeline timeout
    pub pipeline_timeout: Duration,
    /// Parent of the per-video frame directories
    pub work_dir: PathBuf,
    /// Suffix of per-frame text files, before `.txt`
    pub frame_suffix: String,
    /// Timestamps file written into each frame directory
    pub out_file_name: String,
    /// Analyzed frames per second of video
    pub fps: f64,
    pub offsets: FrameOffsets,
    /// Keep frame directories after processing (debugging)
    pub keep_frames: bool,
    /// Consumer name inside the queue group
    pub consumer_name: String,
    /// Sleep between task polls when the queue is empty
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pipeline_cmd: None,
            pipeline_timeout: Duration::from_secs(3600), // 1 hour
            work_dir: PathBuf::from("/tmp/goleador"),
            frame_suffix: String::new(),
            out_file_name: "timestamps.txt".to_string(),
            fps: 1.0,
            offsets: FrameOffsets::default(),
            keep_frames: false,
            consumer_name: format!("worker-{}", Uuid::new_v4()),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = FrameOffsets::default();
        Self {
            pipeline_cmd: std::env::var("WORKER_PIPELINE_CMD")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            pipeline_timeout: Duration::from_secs(
                std::env::var("WORKER_PIPELINE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/goleador")),
            frame_suffix: std::env::var("WORKER_FRAME_SUFFIX").unwrap_or_default(),
            out_file_name: std::env::var("WORKER_OUT_FILE")
                .unwrap_or_else(|_| "timestamps.txt".to_string()),
            fps: std::env::var("WORKER_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            offsets: FrameOffsets {
                leading_thumbnails: std::env::var("WORKER_LEADING_THUMBNAILS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.leading_thumbnails),
                lead_in: std::env::var("WORKER_LEAD_IN_FRAMES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.lead_in),
            },
            keep_frames: std::env::var("WORKER_KEEP_FRAMES")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            consumer_name: std::env::var("WORKER_NAME")
                .unwrap_or_else(|_| format!("worker-{}", Uuid::new_v4())),
            poll_interval: Duration::from_millis(
                std::env::var("WORKER_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
        }
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.pipeline_cmd.is_none() {
            return Err(WorkerError::config_error("WORKER_PIPELINE_CMD is not set"));
        }
        if self.fps.is_nan() || self.fps <= 0.0 {
            return Err(WorkerError::config_error(format!(
                "WORKER_FPS must be positive, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.work_dir, PathBuf::from("/tmp/goleador"));
        assert_eq!(config.offsets, FrameOffsets::default());
        assert!(config.consumer_name.starts_with("worker-"));
        assert_ne!(config.consumer_name, WorkerConfig::default().consumer_name);
    }

    #[test]
    fn test_validate() {
        let config = WorkerConfig::default();
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));

        let config = WorkerConfig {
            pipeline_cmd: Some("ocr.sh".to_string()),
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = WorkerConfig {
            pipeline_cmd: Some("ocr.sh".to_string()),
            fps: 0.0,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
