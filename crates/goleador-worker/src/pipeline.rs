//! External frame/OCR stage.
//!
//! Downloading a video, sampling frames and running OCR on them is done by
//! an external command. The worker only needs it to leave one text file per
//! analyzed frame in the directory it is given.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use goleador_models::VideoId;

use crate::error::{WorkerError, WorkerResult};

/// Environment variable carrying the video id to the pipeline command.
pub const VIDEO_ID_ENV: &str = "GOLEADOR_VIDEO_ID";
/// Environment variable carrying the output directory to the pipeline command.
pub const FRAMES_DIR_ENV: &str = "GOLEADOR_FRAMES_DIR";

/// Longest stderr excerpt carried into an error message.
const STDERR_TAIL_BYTES: usize = 500;

/// Produces the per-frame OCR text files for one video.
#[async_trait]
pub trait FramePipeline: Send + Sync {
    async fn extract_frames(&self, video_id: &VideoId, frames_dir: &Path) -> WorkerResult<()>;
}

/// Runs a shell command with the video id and frame directory in its
/// environment and the frame directory as working directory.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    command: String,
    timeout: Duration,
}

impl CommandPipeline {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FramePipeline for CommandPipeline {
    async fn extract_frames(&self, video_id: &VideoId, frames_dir: &Path) -> WorkerResult<()> {
        debug!(video_id = %video_id, command = %self.command, "Running frame pipeline");

        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env(VIDEO_ID_ENV, video_id.as_str())
            .env(FRAMES_DIR_ENV, frames_dir)
            .current_dir(frames_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                // Dropping the future kills the child
                warn!(video_id = %video_id, "Frame pipeline timed out, killing process");
                return Err(WorkerError::Timeout(self.timeout.as_secs()));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(WorkerError::pipeline_failed(format!(
            "{} ({})",
            output.status,
            stderr_tail(stderr.trim())
        )))
    }
}

fn stderr_tail(stderr: &str) -> &str {
    if stderr.len() <= STDERR_TAIL_BYTES {
        return stderr;
    }
    let mut start = stderr.len() - STDERR_TAIL_BYTES;
    while !stderr.is_char_boundary(start) {
        start += 1;
    }
    &stderr[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_command_sees_environment() {
        let temp = TempDir::new().unwrap();
        let pipeline = CommandPipeline::new(
            r#"echo "INT 1-0 TOT" > "$GOLEADOR_FRAMES_DIR/$GOLEADOR_VIDEO_ID.txt""#,
            Duration::from_secs(10),
        );

        pipeline
            .extract_frames(&VideoId::from("42"), temp.path())
            .await
            .unwrap();

        let text = std::fs::read_to_string(temp.path().join("42.txt")).unwrap();
        assert_eq!(text, "INT 1-0 TOT\n");
    }

    #[tokio::test]
    async fn test_runs_in_frames_dir() {
        let temp = TempDir::new().unwrap();
        let pipeline = CommandPipeline::new("echo 2-0 > 7.txt", Duration::from_secs(10));

        pipeline
            .extract_frames(&VideoId::from("v"), temp.path())
            .await
            .unwrap();

        assert!(temp.path().join("7.txt").exists());
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let temp = TempDir::new().unwrap();
        let pipeline = CommandPipeline::new("echo 'video unavailable' >&2; exit 3", Duration::from_secs(10));

        let err = pipeline
            .extract_frames(&VideoId::from("v"), temp.path())
            .await
            .unwrap_err();

        match err {
            WorkerError::PipelineFailed(msg) => assert!(msg.contains("video unavailable")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let temp = TempDir::new().unwrap();
        let pipeline = CommandPipeline::new("sleep 5", Duration::from_millis(100));

        let err = pipeline
            .extract_frames(&VideoId::from("v"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Timeout(_)));
    }

    #[test]
    fn test_stderr_tail() {
        assert_eq!(stderr_tail("short"), "short");
        let long = "é".repeat(400);
        let tail = stderr_tail(&long);
        assert!(tail.len() <= STDERR_TAIL_BYTES);
        assert!(tail.chars().all(|c| c == 'é'));
    }
}
