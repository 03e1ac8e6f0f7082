//! Processor metrics.
//!
//! Counters for the dispatch loop and the result consumer. Nothing is
//! exported unless the binary installs a recorder.

use goleador_models::ResultStatus;
use metrics::{counter, gauge};

/// Metric name constants for consistency.
pub mod names {
    /// Task messages published.
    pub const TASKS_DISPATCHED_TOTAL: &str = "goleador_tasks_dispatched_total";

    /// Videos whose dispatch failed, by stage.
    pub const DISPATCH_FAILURES_TOTAL: &str = "goleador_dispatch_failures_total";

    /// Videos eligible for dispatch in the last iteration.
    pub const ELIGIBLE_VIDEOS: &str = "goleador_eligible_videos";

    /// Result messages handled, by status.
    pub const RESULTS_TOTAL: &str = "goleador_results_total";

    /// Result messages acknowledged without being stored.
    pub const RESULTS_DROPPED_TOTAL: &str = "goleador_results_dropped_total";
}

pub fn record_dispatched() {
    counter!(names::TASKS_DISPATCHED_TOTAL).increment(1);
}

/// `stage` is `publish`, `start_time` or `query`.
pub fn record_dispatch_failure(stage: &'static str) {
    counter!(names::DISPATCH_FAILURES_TOTAL, "stage" => stage).increment(1);
}

pub fn record_eligible(count: usize) {
    gauge!(names::ELIGIBLE_VIDEOS).set(count as f64);
}

pub fn record_result(status: &ResultStatus) {
    counter!(names::RESULTS_TOTAL, "status" => status_label(status)).increment(1);
}

/// Label for a result status. Unknown statuses share one label so a
/// misbehaving worker cannot grow the label set.
fn status_label(status: &ResultStatus) -> &'static str {
    match status {
        ResultStatus::Ok => "ok",
        ResultStatus::Error => "error",
        ResultStatus::Other(_) => "other",
    }
}

pub fn record_dropped() {
    counter!(names::RESULTS_DROPPED_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::TASKS_DISPATCHED_TOTAL.starts_with("goleador_"));
        assert!(names::DISPATCH_FAILURES_TOTAL.contains("failures"));
        assert!(names::RESULTS_TOTAL.contains("results"));
    }

    #[test]
    fn test_unknown_statuses_share_a_label() {
        assert_eq!(status_label(&ResultStatus::Ok), "ok");
        assert_eq!(status_label(&ResultStatus::Error), "error");
        assert_eq!(status_label(&ResultStatus::from("retry")), "other");
        assert_eq!(status_label(&ResultStatus::from("x".repeat(64).as_str())), "other");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_dispatched();
        record_dispatch_failure("publish");
        record_eligible(3);
        record_result(&ResultStatus::Ok);
        record_result(&ResultStatus::Other("pending".to_string()));
        record_dropped();
    }
}
