//! Wire format of the task and result queues.
//!
//! Both message kinds are plain UTF-8 text so workers in any language can
//! speak the protocol:
//! - task: `<videoId>`
//! - result: `<videoId>:<status>:<value>` with `status` in `ok`/`error`

use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::video::VideoId;

/// Request for a worker to process one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMessage {
    pub video_id: VideoId,
}

impl TaskMessage {
    pub fn new(video_id: impl Into<VideoId>) -> Self {
        Self {
            video_id: video_id.into(),
        }
    }

    /// Decode a task body.
    pub fn parse(body: &[u8]) -> ModelResult<Self> {
        let text = std::str::from_utf8(body)?;
        if text.is_empty() {
            return Err(ModelError::malformed("empty task message"));
        }
        Ok(Self::new(text))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.video_id.as_str().as_bytes().to_vec()
    }
}

/// Status field of a result message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStatus {
    Ok,
    Error,
    /// Anything else; carried through so the consumer can ignore it
    Other(String),
}

impl ResultStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ResultStatus::Ok => "ok",
            ResultStatus::Error => "error",
            ResultStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ResultStatus {
    fn from(s: &str) -> Self {
        match s {
            "ok" => ResultStatus::Ok,
            "error" => ResultStatus::Error,
            other => ResultStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome reported by a worker for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    pub video_id: VideoId,
    pub status: ResultStatus,
    /// Comma separated times for `ok`, free text for `error`
    pub value: String,
}

impl ResultMessage {
    /// Successful result carrying goal times.
    pub fn ok(video_id: impl Into<VideoId>, times: &[i64]) -> Self {
        Self {
            video_id: video_id.into(),
            status: ResultStatus::Ok,
            value: format_times(times),
        }
    }

    /// Failed result carrying an error message.
    pub fn error(video_id: impl Into<VideoId>, message: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            status: ResultStatus::Error,
            value: message.into(),
        }
    }

    /// Decode a result body.
    ///
    /// The body is split on `:` into at most three fields, so an error value
    /// may itself contain colons. A missing value is read as empty.
    pub fn parse(body: &[u8]) -> ModelResult<Self> {
        let text = std::str::from_utf8(body)?;
        let mut fields = text.splitn(3, ':');

        let video_id = fields.next().unwrap_or_default();
        if video_id.is_empty() {
            return Err(ModelError::malformed(format!("missing video id in '{}'", text)));
        }
        let status = fields
            .next()
            .ok_or_else(|| ModelError::malformed(format!("missing status in '{}'", text)))?;
        let value = fields.next().unwrap_or_default();

        Ok(Self {
            video_id: VideoId::from(video_id),
            status: ResultStatus::from(status),
            value: value.to_string(),
        })
    }

    /// Parse the value of an `ok` result as goal times.
    pub fn times(&self) -> ModelResult<Vec<i64>> {
        parse_times(&self.value)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for ResultMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.video_id, self.status, self.value)
    }
}

/// Join goal times with commas.
pub fn format_times(times: &[i64]) -> String {
    times
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse comma separated goal times. An empty string is an empty list.
pub fn parse_times(value: &str) -> ModelResult<Vec<i64>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| {
            part.parse::<i64>().map_err(|source| ModelError::InvalidTime {
                value: part.to_string(),
                source,
            })
        })
        .collect()
}
