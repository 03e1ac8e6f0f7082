//! Video job store.
//!
//! This crate provides:
//! - The `VideoStore` contract used by the processor
//! - A Redis-backed store for deployments
//! - An in-memory store for tests and local runs
//!
//! All updates are idempotent upserts keyed by video id, which is what makes
//! re-dispatching a stale job safe.

pub mod config;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryVideoStore;
pub use redis_store::RedisVideoStore;
pub use store::VideoStore;
