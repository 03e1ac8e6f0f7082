//! Goal extraction worker.
//!
//! This crate provides:
//! - `JobExecutor`: consumes task messages, extracts goal times and
//!   publishes result messages
//! - `FramePipeline`: the external frame/OCR stage, run as a shell command
//! - Structured per-video logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::VideoLogger;
pub use pipeline::{CommandPipeline, FramePipeline};
