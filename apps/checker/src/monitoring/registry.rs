//! In-memory schedule of every known monitor.
//!
//! The registry owns one [`ScheduleEntry`] per monitor. It is rebuilt from
//! storage on startup and on every full refresh, and patched in between by
//! update-flag reconciliation. Nothing outside this module mutates entries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::dispatch::CheckRunner;
use super::schedule::{ScheduleCalculator, next_check_after};
use super::types::{Monitor, MonitorType, ProbeOutcome, ScheduleEntry};
use crate::database::Database;

pub struct MonitorRegistry {
    database: Arc<dyn Database>,
    runner: Arc<CheckRunner>,
    calculator: ScheduleCalculator,
    entries: BTreeMap<i64, ScheduleEntry>,
    refresh_interval: Duration,
    last_refresh: Instant,
}

impl MonitorRegistry {
    pub fn new(database: Arc<dyn Database>, runner: Arc<CheckRunner>, refresh_interval: Duration) -> Self {
        Self {
            calculator: ScheduleCalculator::new(database.clone()),
            database,
            runner,
            entries: BTreeMap::new(),
            refresh_interval,
            last_refresh: Instant::now(),
        }
    }

    /// Initial load.
    ///
    /// Monitors that were never checked are probed right away so every entry
    /// starts from a real outcome. Failing to list the monitors is returned
    /// and treated as fatal by the caller; an unreadable log of one monitor
    /// only makes that monitor due now.
    pub async fn load(&mut self) -> Result<Vec<ProbeOutcome>> {
        let monitors = self.fetch_all().await.context("Failed to list monitors")?;
        let mut entries = BTreeMap::new();
        let mut outcomes = Vec::new();

        for monitor in monitors {
            let next_check = match self.database.latest_outcome(monitor.id).await {
                Ok(Some(outcome)) => next_check_after(Some(&outcome), monitor.periodicity, Utc::now()),
                Err(e) => {
                    warn!(monitor_id = monitor.id, "Failed to read latest outcome, checking now: {}", e);
                    Utc::now()
                }
                Ok(None) => {
                    debug!(monitor_id = monitor.id, "Monitor [{}] was never checked", monitor.label);
                    let run = self.runner.run(&monitor).await;
                    outcomes.push(run.outcome);
                    run.next_check.unwrap_or_else(Utc::now)
                }
            };

            entries.insert(monitor.id, ScheduleEntry { monitor, next_check });
        }

        self.entries = entries;
        self.last_refresh = Instant::now();
        self.log_inventory();
        Ok(outcomes)
    }

    /// Rebuild every entry from storage.
    ///
    /// A failed listing keeps the current set. A failed due-time lookup keeps
    /// the monitor's previous due time, or makes it due now if it is new.
    pub async fn refresh(&mut self) {
        self.last_refresh = Instant::now();

        let monitors = match self.fetch_all().await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!("Full refresh failed, keeping {} known monitors: {}", self.entries.len(), e);
                return;
            }
        };

        let mut entries = BTreeMap::new();
        for monitor in monitors {
            let next_check = match self.calculator.next_check_time(&monitor).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(monitor_id = monitor.id, "Failed to compute next check: {}", e);
                    self.entries.get(&monitor.id).map(|entry| entry.next_check).unwrap_or_else(Utc::now)
                }
            };
            entries.insert(monitor.id, ScheduleEntry { monitor, next_check });
        }

        let removed = self.entries.keys().filter(|id| !entries.contains_key(id)).count();
        let added = entries.keys().filter(|id| !self.entries.contains_key(id)).count();
        self.entries = entries;

        info!(
            monitors = self.entries.len(),
            added,
            removed,
            "Monitor list refreshed"
        );
    }

    pub fn refresh_due(&self) -> bool {
        self.last_refresh.elapsed() >= self.refresh_interval
    }

    /// Apply pending update flags.
    ///
    /// Each flagged monitor is reloaded, probed immediately and rescheduled
    /// from that outcome, then its flag is cleared. A flag stays raised when
    /// the outcome could not be recorded. Flags of monitors that no longer
    /// exist drop the stale entry and are cleared without a probe. An error
    /// listing the flags is returned so the tick can skip this step.
    ///
    /// Returns one outcome per monitor probed here.
    pub async fn reconcile_update_flags(&mut self) -> Result<Vec<ProbeOutcome>> {
        let pending = self.database.list_pending_update_flags().await?;
        let mut outcomes = Vec::new();

        for monitor_id in pending {
            let monitor = match self.database.get_monitor(monitor_id).await {
                Ok(Some(monitor)) => monitor,
                Ok(None) => {
                    if self.entries.remove(&monitor_id).is_some() {
                        info!(monitor_id, "Monitor is gone, dropped from schedule");
                    } else {
                        debug!(monitor_id, "Update flag for unknown monitor ignored");
                    }
                    self.clear_flag(monitor_id).await;
                    continue;
                }
                Err(e) => {
                    warn!(monitor_id, "Failed to reload flagged monitor: {}", e);
                    continue;
                }
            };

            info!(monitor_id, "Monitor [{}] changed, checking now", monitor.label);
            self.entries
                .insert(monitor_id, ScheduleEntry { monitor: monitor.clone(), next_check: Utc::now() });

            let run = self.runner.run(&monitor).await;
            outcomes.push(run.outcome);

            match run.next_check {
                Some(next_check) => {
                    self.reschedule(monitor_id, next_check);
                    self.clear_flag(monitor_id).await;
                }
                // Not recorded: the flag stays raised and the next tick retries
                None => warn!(monitor_id, "Outcome not recorded, update flag kept"),
            }
        }

        Ok(outcomes)
    }

    /// Monitors due at `now`, in id order
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Monitor> {
        self.entries.values().filter(|entry| entry.is_due(now)).map(|entry| entry.monitor.clone()).collect()
    }

    /// Move an entry's due time. Entries removed in the meantime stay removed.
    pub fn reschedule(&mut self, monitor_id: i64, next_check: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(&monitor_id) {
            entry.next_check = next_check;
        }
    }

    pub fn get(&self, monitor_id: i64) -> Option<&ScheduleEntry> {
        self.entries.get(&monitor_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fetch_all(&self) -> Result<Vec<Monitor>> {
        let mut monitors = Vec::new();
        for monitor_type in MonitorType::ALL {
            monitors.extend(self.database.list_monitors(monitor_type).await?);
        }
        Ok(monitors)
    }

    async fn clear_flag(&self, monitor_id: i64) {
        if let Err(e) = self.database.clear_update_flag(monitor_id).await {
            warn!(monitor_id, "Failed to clear update flag: {}", e);
        }
    }

    fn log_inventory(&self) {
        info!("Loaded {} monitors", self.entries.len());
        for entry in self.entries.values() {
            info!(
                monitor_id = entry.monitor.id,
                kind = %entry.monitor.monitor_type(),
                "  [{}] {} every {}s, next check at {}",
                entry.monitor.label,
                entry.monitor.kind.target(),
                entry.monitor.periodicity,
                entry.next_check
            );
        }
    }
}
