use std::time::{Duration, Instant};
use tracing::info;

use super::types::ProbeOutcome;

/// Running totals of the checks performed since startup
#[derive(Debug)]
pub struct CheckStats {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    total_response_ms: u64,
    last_report: Instant,
    report_interval: Duration,
}

impl CheckStats {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            total_response_ms: 0,
            last_report: Instant::now(),
            report_interval,
        }
    }

    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.total += 1;
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.total_response_ms = self.total_response_ms.saturating_add(outcome.response_time_ms);
    }

    pub fn average_response_ms(&self) -> u64 {
        if self.total == 0 { 0 } else { self.total_response_ms / self.total }
    }

    /// Log a summary once the report interval has elapsed
    pub fn report_if_due(&mut self, monitors: usize) {
        if self.last_report.elapsed() < self.report_interval {
            return;
        }

        info!(
            monitors,
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            avg_response_ms = self.average_response_ms(),
            "Checker stats: {} checks ({} succeeded, {} failed) across {} monitors",
            self.total,
            self.succeeded,
            self.failed,
            monitors
        );
        self.last_report = Instant::now();
    }
}
