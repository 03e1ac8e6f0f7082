//! Video job models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Where a video is in its processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoState {
    /// Registered, never handed to a worker
    #[default]
    Registered,
    /// Task published, waiting for a result
    Dispatched,
    /// Goal times recorded
    Done,
    /// Worker reported an error
    Failed,
}

impl VideoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoState::Registered => "registered",
            VideoState::Dispatched => "dispatched",
            VideoState::Done => "done",
            VideoState::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more dispatches expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoState::Done | VideoState::Failed)
    }
}

impl fmt::Display for VideoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result recorded for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    /// Goal times in seconds from the start of the video
    Done { times: Vec<i64> },
    /// Error message reported by the worker
    Failed { error: String },
}

/// A video tracked by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub video_id: VideoId,

    /// When the latest task for this video was published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VideoOutcome>,
}

impl VideoJob {
    /// Create a freshly registered job.
    pub fn new(video_id: impl Into<VideoId>) -> Self {
        Self {
            video_id: video_id.into(),
            processing_started_at: None,
            outcome: None,
        }
    }

    pub fn state(&self) -> VideoState {
        match (&self.outcome, self.processing_started_at) {
            (Some(VideoOutcome::Done { .. }), _) => VideoState::Done,
            (Some(VideoOutcome::Failed { .. }), _) => VideoState::Failed,
            (None, Some(_)) => VideoState::Dispatched,
            (None, None) => VideoState::Registered,
        }
    }

    /// Whether the dispatcher should publish a task for this video.
    ///
    /// Unfinished videos are eligible when they were never started or when
    /// their last start is older than `cutoff`.
    pub fn is_eligible(&self, cutoff: DateTime<Utc>) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        match self.processing_started_at {
            None => true,
            Some(started) => started < cutoff,
        }
    }

    pub fn mark_dispatched(&mut self, at: DateTime<Utc>) {
        self.processing_started_at = Some(at);
    }

    pub fn complete(&mut self, times: Vec<i64>) {
        self.outcome = Some(VideoOutcome::Done { times });
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.outcome = Some(VideoOutcome::Failed {
            error: error.into(),
        });
    }

    /// Recorded goal times, if the video finished successfully.
    pub fn times(&self) -> Option<&[i64]> {
        match &self.outcome {
            Some(VideoOutcome::Done { times }) => Some(times),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lifecycle_states() {
        let mut job = VideoJob::new("abc");
        assert_eq!(job.state(), VideoState::Registered);

        job.mark_dispatched(Utc::now());
        assert_eq!(job.state(), VideoState::Dispatched);

        job.complete(vec![33, 103]);
        assert_eq!(job.state(), VideoState::Done);
        assert_eq!(job.times(), Some(&[33, 103][..]));

        job.fail("boom");
        assert_eq!(job.state(), VideoState::Failed);
        assert!(job.times().is_none());
    }

    #[test]
    fn test_eligibility() {
        let now = Utc::now();
        let cutoff = now - Duration::hours(1);

        let fresh = VideoJob::new("fresh");
        assert!(fresh.is_eligible(cutoff));

        let mut recent = VideoJob::new("recent");
        recent.mark_dispatched(now - Duration::minutes(5));
        assert!(!recent.is_eligible(cutoff));

        let mut stale = VideoJob::new("stale");
        stale.mark_dispatched(now - Duration::hours(2));
        assert!(stale.is_eligible(cutoff));

        let mut done = VideoJob::new("done");
        done.mark_dispatched(now - Duration::hours(2));
        done.complete(vec![]);
        assert!(!done.is_eligible(cutoff));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = VideoOutcome::Done { times: vec![1, 2] };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"status":"done","times":[1,2]}"#);
    }
}
