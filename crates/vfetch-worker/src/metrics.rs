//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CREATED_TOTAL: &str = "vfetch_jobs_created_total";
    pub const JOBS_READY_TOTAL: &str = "vfetch_jobs_ready_total";
    pub const JOBS_FAILED_TOTAL: &str = "vfetch_jobs_failed_total";
    pub const JOBS_SWEPT_TOTAL: &str = "vfetch_jobs_swept_total";
    pub const ROTATIONS_TOTAL: &str = "vfetch_rotations_total";
    pub const PACKAGING_TOTAL: &str = "vfetch_packaging_total";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "vfetch_download_duration_seconds";
}

pub fn record_job_created() {
    counter!(names::JOBS_CREATED_TOTAL).increment(1);
}

pub fn record_job_ready() {
    counter!(names::JOBS_READY_TOTAL).increment(1);
}

/// Record a job failure. `reason` is a short fixed label.
pub fn record_job_failed(reason: &'static str) {
    counter!(names::JOBS_FAILED_TOTAL, "reason" => reason).increment(1);
}

pub fn record_jobs_swept(count: usize) {
    counter!(names::JOBS_SWEPT_TOTAL).increment(count as u64);
}

pub fn record_rotation(angle: u16, outcome: &'static str) {
    let labels = [("angle", angle.to_string()), ("outcome", outcome.to_string())];
    counter!(names::ROTATIONS_TOTAL, &labels).increment(1);
}

pub fn record_packaging(outcome: &'static str) {
    counter!(names::PACKAGING_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_download_duration(duration_secs: f64) {
    histogram!(names::DOWNLOAD_DURATION_SECONDS).record(duration_secs);
}
