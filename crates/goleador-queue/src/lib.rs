//! Task and result queues for Goleador.
//!
//! This crate provides:
//! - The `Broker` abstraction over durable, manually acknowledged queues
//! - A Redis Streams broker and an in-memory broker
//! - `SharedChannel`, the lock that serializes every channel operation
//! - Connection retry with a fixed backoff

pub mod broker;
pub mod channel;
pub mod config;
pub mod error;
pub mod memory;
pub mod redis_broker;
pub mod retry;

pub use broker::{Broker, Delivery};
pub use channel::SharedChannel;
pub use config::{QueueConfig, RESULT_QUEUE_NAME, TASK_QUEUE_NAME};
pub use error::{QueueError, QueueResult};
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;
pub use retry::{connect_with_retry, ConnectRetry};
