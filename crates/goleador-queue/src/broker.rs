//! Broker abstraction.

use async_trait::async_trait;

use crate::error::QueueResult;

/// A message taken from a queue and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned tag used to acknowledge the message
    pub tag: String,
    /// Raw message body
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(tag: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.into(),
            body: body.into(),
        }
    }
}

/// One open channel to a message broker.
///
/// Methods take `&mut self`: a channel is not safe for unsynchronized
/// concurrent use. Share it through [`crate::SharedChannel`].
#[async_trait]
pub trait Broker: Send {
    /// Declare a durable queue. Declaring an existing queue is a no-op.
    async fn declare_queue(&mut self, queue: &str) -> QueueResult<()>;

    /// Append a message to a queue, returning its broker id.
    async fn publish(&mut self, queue: &str, body: &[u8]) -> QueueResult<String>;

    /// Take up to `max` unacknowledged messages without blocking.
    async fn fetch(&mut self, queue: &str, max: usize) -> QueueResult<Vec<Delivery>>;

    /// Acknowledge a delivery so it is never handed out again.
    async fn ack(&mut self, queue: &str, tag: &str) -> QueueResult<()>;
}
