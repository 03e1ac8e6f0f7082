//! Queue configuration.

use std::time::Duration;

/// Queue that carries video ids to workers.
pub const TASK_QUEUE_NAME: &str = "task_queue";
/// Queue that carries worker results back to the processor.
pub const RESULT_QUEUE_NAME: &str = "result_queue";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Consumer group used on both queues
    pub consumer_group: String,
    /// Name of this consumer inside the group
    pub consumer_name: String,
    /// Delay between broker connection attempts
    pub connect_retry_delay: Duration,
    /// How long a delivery may stay unacknowledged before another consumer
    /// takes it over. Must exceed the longest time a consumer holds one.
    pub claim_min_idle: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            consumer_group: "goleador".to_string(),
            consumer_name: "processor".to_string(),
            connect_retry_delay: Duration::from_secs(10),
            claim_min_idle: Duration::from_secs(7200), // 2 hours
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "goleador".to_string()),
            consumer_name: std::env::var("QUEUE_CONSUMER_NAME")
                .unwrap_or_else(|_| "processor".to_string()),
            connect_retry_delay: Duration::from_secs(
                std::env::var("QUEUE_CONNECT_RETRY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("QUEUE_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(7200),
            ),
        }
    }

    /// Override the consumer name.
    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }
}
