use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

use super::types::ProbeOutcome;
use crate::database::Database;

/// Appends probe outcomes to the log
pub struct ResultRecorder {
    database: Arc<dyn Database>,
}

impl ResultRecorder {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    pub async fn record(&self, outcome: &ProbeOutcome) -> Result<()> {
        if let Err(e) = self.database.append_outcome(outcome).await {
            error!(monitor_id = outcome.monitor_id, "Failed to save outcome to database: {}", e);
            return Err(e);
        }

        debug!(
            monitor_id = outcome.monitor_id,
            "Log saved: {} at {} ({} ms)",
            outcome.status,
            outcome.started_at,
            outcome.response_time_ms
        );
        Ok(())
    }
}
