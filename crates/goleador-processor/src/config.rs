//! Processor configuration.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{ProcessorError, ProcessorResult};

/// Processor configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Pause between dispatch iterations; zero disables it
    pub dispatch_delay: Duration,
    /// How long a dispatched video may go without a result before it is
    /// dispatched again
    pub processing_gap: Duration,
    /// Sleep between result polls when the queue is empty
    pub result_poll_interval: Duration,
    /// Maximum results fetched per poll
    pub result_batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            dispatch_delay: Duration::from_secs(15),
            processing_gap: Duration::from_secs(3600), // 1 hour
            result_poll_interval: Duration::from_millis(500),
            result_batch_size: 10,
        }
    }
}

impl ProcessorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            dispatch_delay: Duration::from_secs(
                std::env::var("PROCESSOR_DISPATCH_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            processing_gap: Duration::from_secs(
                std::env::var("PROCESSOR_PROCESSING_GAP_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            result_poll_interval: Duration::from_millis(
                std::env::var("PROCESSOR_RESULT_POLL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            result_batch_size: std::env::var("PROCESSOR_RESULT_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }

    pub fn validate(&self) -> ProcessorResult<()> {
        if self.result_batch_size == 0 {
            return Err(ProcessorError::config_error(
                "PROCESSOR_RESULT_BATCH_SIZE must be at least 1",
            ));
        }
        if self.result_poll_interval.is_zero() {
            return Err(ProcessorError::config_error(
                "PROCESSOR_RESULT_POLL_MS must be at least 1",
            ));
        }
        Ok(())
    }

    /// Videos started before the returned instant are considered stale.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.processing_gap)
            .ok()
            .and_then(|gap| now.checked_sub_signed(gap))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
