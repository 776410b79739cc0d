use anyhow::Result;
use chrono::{SubsecRound, Utc};
use std::time::Duration;
use tracing::{info, warn};

use super::checker::{CheckReport, PingChecker, WebsiteChecker, round_millis};
use super::types::{Monitor, MonitorKind, ProbeOutcome, ProbeStatus};

/// Probe executor - runs the check matching a monitor's kind
pub struct ProbeExecutor {
    ping_checker: PingChecker,
    website_checker: WebsiteChecker,
}

impl ProbeExecutor {
    /// Create a new executor with the given per-kind timeouts
    pub fn new(ping_timeout: Duration, website_timeout: Duration) -> Result<Self> {
        Ok(Self {
            ping_checker: PingChecker::new(ping_timeout),
            website_checker: WebsiteChecker::new(website_timeout)?,
        })
    }

    /// Execute one probe.
    ///
    /// Never fails: every network or validation problem becomes a
    /// [`ProbeStatus::Failed`] outcome and is logged here.
    pub async fn execute(&self, monitor: &Monitor) -> ProbeOutcome {
        let started_at = Utc::now().trunc_subsecs(0);

        let report = match &monitor.kind {
            MonitorKind::Ping { hostname, port } => self.ping_checker.check(hostname, *port).await,
            MonitorKind::Website { url, enforce_status, keywords } => {
                self.website_checker.check(url, *enforce_status, keywords).await
            }
        };

        let outcome = ProbeOutcome {
            monitor_id: monitor.id,
            started_at,
            status: if report.is_success() { ProbeStatus::Succeeded } else { ProbeStatus::Failed },
            response_time_ms: round_millis(report.elapsed),
        };

        log_report(monitor, &report, &outcome);
        outcome
    }
}

fn log_report(monitor: &Monitor, report: &CheckReport, outcome: &ProbeOutcome) {
    match &report.failure {
        None => info!(
            monitor_id = monitor.id,
            kind = %monitor.monitor_type(),
            status_code = report.status_code,
            "Monitor [{}] {} - {} in {} ms",
            monitor.label,
            monitor.kind.target(),
            outcome.status,
            outcome.response_time_ms
        ),
        Some(reason) => warn!(
            monitor_id = monitor.id,
            kind = %monitor.monitor_type(),
            status_code = report.status_code,
            "Monitor [{}] {} - {} in {} ms: {}",
            monitor.label,
            monitor.kind.target(),
            outcome.status,
            outcome.response_time_ms,
            reason
        ),
    }
}
