use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use super::dispatch::{CheckRun, CheckRunner};
use super::registry::MonitorRegistry;
use super::stats::CheckStats;

/// Scheduler settings, taken from the `[checker]` config section
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub tick: Duration,
    pub max_concurrent_probes: usize,
    pub stats_interval: Duration,
}

/// Monitoring scheduler - drives the registry on a fixed tick
pub struct MonitoringScheduler {
    registry: MonitorRegistry,
    runner: Arc<CheckRunner>,
    settings: SchedulerSettings,
    stats: CheckStats,
}

impl MonitoringScheduler {
    pub fn new(registry: MonitorRegistry, runner: Arc<CheckRunner>, settings: SchedulerSettings) -> Self {
        Self {
            registry,
            runner,
            stats: CheckStats::new(settings.stats_interval),
            settings: SchedulerSettings { max_concurrent_probes: settings.max_concurrent_probes.max(1), ..settings },
        }
    }

    /// Run forever. The registry must already be loaded.
    pub async fn run(mut self) {
        let mut timer = interval(self.settings.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately; start with an idle wait
        timer.tick().await;

        loop {
            timer.tick().await;
            self.tick().await;
        }
    }

    /// One pass: refresh if due, apply update flags, then probe whatever is due
    pub async fn tick(&mut self) {
        if self.registry.refresh_due() {
            self.registry.refresh().await;
        }

        // Monitors probed by reconciliation are not probed again this tick
        let mut checked = HashSet::new();
        match self.registry.reconcile_update_flags().await {
            Ok(outcomes) => {
                for outcome in &outcomes {
                    self.stats.record(outcome);
                    checked.insert(outcome.monitor_id);
                }
            }
            Err(e) => warn!("Skipping update flags this tick: {}", e),
        }

        let due: Vec<_> =
            self.registry.due(Utc::now()).into_iter().filter(|monitor| !checked.contains(&monitor.id)).collect();
        if !due.is_empty() {
            debug!("{} monitors due", due.len());

            let runner = &self.runner;
            let runs: Vec<(i64, CheckRun)> = stream::iter(due)
                .map(|monitor| async move {
                    let run = runner.run(&monitor).await;
                    (monitor.id, run)
                })
                .buffer_unordered(self.settings.max_concurrent_probes)
                .collect()
                .await;

            for (monitor_id, run) in runs {
                self.stats.record(&run.outcome);
                if let Some(next_check) = run.next_check {
                    self.registry.reschedule(monitor_id, next_check);
                }
            }
        }

        self.stats.report_if_due(self.registry.len());
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &CheckStats {
        &self.stats
    }
}
