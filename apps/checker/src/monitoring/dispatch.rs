use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::executor::ProbeExecutor;
use super::recorder::ResultRecorder;
use super::schedule::{ScheduleCalculator, next_check_after};
use super::types::{Monitor, ProbeOutcome};
use crate::database::Database;

/// Result of one probe run through [`CheckRunner`]
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub outcome: ProbeOutcome,

    /// New due time, `None` when the outcome could not be persisted and the
    /// entry should stay as it is
    pub next_check: Option<DateTime<Utc>>,
}

/// Probe, persist, recompute: the unit of work the loop dispatches
pub struct CheckRunner {
    executor: ProbeExecutor,
    recorder: ResultRecorder,
    calculator: ScheduleCalculator,
}

impl CheckRunner {
    pub fn new(executor: ProbeExecutor, database: Arc<dyn Database>) -> Self {
        Self {
            executor,
            recorder: ResultRecorder::new(database.clone()),
            calculator: ScheduleCalculator::new(database),
        }
    }

    pub async fn run(&self, monitor: &Monitor) -> CheckRun {
        let outcome = self.executor.execute(monitor).await;

        if self.recorder.record(&outcome).await.is_err() {
            // Left due, so the next tick probes it again
            return CheckRun { outcome, next_check: None };
        }

        let next_check = match self.calculator.next_check_time(monitor).await {
            Ok(next) => next,
            Err(e) => {
                warn!(monitor_id = monitor.id, "Failed to read back latest outcome: {}", e);
                next_check_after(Some(&outcome), monitor.periodicity, Utc::now())
            }
        };

        debug!(monitor_id = monitor.id, "Next check of [{}] at {}", monitor.label, next_check);
        CheckRun { outcome, next_check: Some(next_check) }
    }
}
