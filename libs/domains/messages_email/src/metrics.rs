//! Drain metrics
//!
//! Recorded through the `metrics` facade; the worker binary installs the
//! Prometheus recorder.

use metrics::{counter, histogram};
use push_queue::JobFilter;
use std::time::Duration;

#[derive(Clone)]
pub struct DrainMetrics {
    method: String,
    interval: String,
}

impl DrainMetrics {
    pub fn new(filter: &JobFilter) -> Self {
        Self {
            method: filter.method.clone(),
            interval: filter.interval.to_string(),
        }
    }

    pub fn job_dispatched(&self) {
        counter!(
            "messages_email_jobs_dispatched_total",
            "method" => self.method.clone(),
            "interval" => self.interval.clone()
        )
        .increment(1);
    }

    pub fn job_stale(&self) {
        counter!(
            "messages_email_jobs_stale_total",
            "method" => self.method.clone(),
            "interval" => self.interval.clone()
        )
        .increment(1);
    }

    pub fn run_finished(&self, status: &'static str, duration: Duration) {
        counter!(
            "messages_email_runs_total",
            "method" => self.method.clone(),
            "interval" => self.interval.clone(),
            "status" => status
        )
        .increment(1);

        histogram!(
            "messages_email_run_duration_seconds",
            "method" => self.method.clone(),
            "interval" => self.interval.clone()
        )
        .record(duration.as_secs_f64());
    }
}
