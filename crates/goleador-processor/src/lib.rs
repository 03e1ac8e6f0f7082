//! Goleador processor.
//!
//! This crate provides:
//! - `Dispatcher`: publishes a task for every unfinished video and stamps
//!   its processing start, re-dispatching videos whose worker went quiet
//! - `Collector`: consumes worker results and persists them
//! - `Processor`: broker connection, queue declaration and both loops

pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod processor;

pub use collector::{Collector, ResultOutcome};
pub use config::ProcessorConfig;
pub use dispatcher::{Clock, DispatchSummary, Dispatcher};
pub use error::{ProcessorError, ProcessorResult};
pub use processor::Processor;
