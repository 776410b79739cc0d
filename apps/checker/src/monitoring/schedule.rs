use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::types::{Monitor, ProbeOutcome};
use crate::database::Database;

/// Works out when a monitor is due next from its log
pub struct ScheduleCalculator {
    database: Arc<dyn Database>,
}

impl ScheduleCalculator {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Latest start time plus periodicity, or now when the monitor was never checked
    pub async fn next_check_time(&self, monitor: &Monitor) -> Result<DateTime<Utc>> {
        let latest = self.database.latest_outcome(monitor.id).await?;
        Ok(next_check_after(latest.as_ref(), monitor.periodicity, Utc::now()))
    }
}

/// Pure part of [`ScheduleCalculator::next_check_time`]
pub fn next_check_after(
    latest: Option<&ProbeOutcome>,
    periodicity: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match latest {
        Some(outcome) => outcome.started_at + Duration::seconds(periodicity as i64),
        None => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fixtures::{NewMonitor, TestDatabase};
    use crate::monitoring::types::{MonitorKind, ProbeStatus};
    use chrono::{FixedOffset, TimeZone};

    fn outcome_at(started_at: DateTime<Utc>) -> ProbeOutcome {
        ProbeOutcome { monitor_id: 1, started_at, status: ProbeStatus::Succeeded, response_time_ms: 12 }
    }

    #[test]
    fn test_next_check_adds_periodicity() {
        let started = Utc.with_ymd_and_hms(2025, 8, 13, 23, 59, 50).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 14, 12, 0, 0).unwrap();

        for periodicity in [5u32, 42, 300] {
            let next = next_check_after(Some(&outcome_at(started)), periodicity, now);
            assert_eq!(next, started + Duration::seconds(periodicity as i64));
        }
    }

    #[test]
    fn test_next_check_independent_of_offset() {
        // Same instant expressed in another zone yields the same due time
        let zone = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let local = zone.with_ymd_and_hms(2025, 3, 30, 2, 30, 0).unwrap();
        let started = local.with_timezone(&Utc);

        let next = next_check_after(Some(&outcome_at(started)), 60, Utc::now());
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 29, 21, 1, 0).unwrap());
    }

    #[test]
    fn test_never_checked_is_due_now() {
        let now = Utc::now();
        assert_eq!(next_check_after(None, 300, now), now);
    }

    #[tokio::test]
    async fn test_calculator_reads_latest_outcome() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let id = test_db.insert_monitor(&NewMonitor::ping("db", "127.0.0.1", 5432).with_periodicity(45)).await?;
        let monitor = Monitor {
            id,
            label: "db".to_string(),
            periodicity: 45,
            kind: MonitorKind::Ping { hostname: "127.0.0.1".to_string(), port: 5432 },
        };
        let calculator = ScheduleCalculator::new(test_db.database.clone());

        let before = Utc::now();
        assert!(calculator.next_check_time(&monitor).await? <= Utc::now());
        assert!(calculator.next_check_time(&monitor).await? >= before - Duration::seconds(1));

        let started = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        test_db.database.append_outcome(&ProbeOutcome { monitor_id: id, ..outcome_at(started) }).await?;

        assert_eq!(calculator.next_check_time(&monitor).await?, started + Duration::seconds(45));
        Ok(())
    }
}
