//! Broker connection retry.
//!
//! The broker usually starts alongside the services that use it, so a
//! refused connection is expected at boot. Connection errors are retried
//! forever with a fixed delay; any other error is returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::error::QueueResult;

/// Fixed-delay retry policy for connecting to the broker.
#[derive(Debug, Clone)]
pub struct ConnectRetry {
    /// Delay between attempts.
    pub delay: Duration,
    /// Target name for logging.
    pub target: String,
}

impl Default for ConnectRetry {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            target: "broker".to_string(),
        }
    }
}

impl ConnectRetry {
    pub fn new(target: impl Into<String>, delay: Duration) -> Self {
        Self {
            delay,
            target: target.into(),
        }
    }
}

/// Run `connect` until it succeeds or fails with a non-connection error.
///
/// # Example
/// ```ignore
/// let retry = ConnectRetry::new("broker", config.connect_retry_delay);
/// let broker = connect_with_retry(&retry, || RedisBroker::connect(&config)).await?;
/// ```
pub async fn connect_with_retry<F, Fut, T>(policy: &ConnectRetry, mut connect: F) -> QueueResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = QueueResult<T>>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match connect().await {
            Ok(value) => {
                info!(attempts = attempt, "Successfully connected to {}", policy.target);
                return Ok(value);
            }
            Err(e) if e.is_connection_error() => {
                error!(
                    attempt,
                    "Can't connect to {}, retrying in {:?}: {}",
                    policy.target, policy.delay, e
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
