use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use libsql::params;
use tracing::warn;

use super::models::{MONITOR_COLUMNS, MonitorRow, format_timestamp, outcome_from_row};
use crate::monitoring::types::{Monitor, MonitorType, ProbeOutcome};
use crate::pool::{LibsqlManager, LibsqlPool};

/// Storage operations the checker depends on
#[async_trait]
pub trait Database: Send + Sync {
    /// All valid monitors of one type
    async fn list_monitors(&self, monitor_type: MonitorType) -> Result<Vec<Monitor>>;

    /// A single monitor, `None` when it does not exist (or cannot be probed)
    async fn get_monitor(&self, id: i64) -> Result<Option<Monitor>>;

    /// Most recent log entry of a monitor by start time
    async fn latest_outcome(&self, monitor_id: i64) -> Result<Option<ProbeOutcome>>;

    /// Append a log entry
    async fn append_outcome(&self, outcome: &ProbeOutcome) -> Result<()>;

    /// Monitors whose update flag is raised
    async fn list_pending_update_flags(&self) -> Result<Vec<i64>>;

    /// Lower the update flag of a monitor
    async fn clear_update_flag(&self, monitor_id: i64) -> Result<()>;
}

/// LibSQL database implementation
pub struct LibsqlDatabase {
    pool: LibsqlPool,
}

impl LibsqlDatabase {
    pub fn new(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn monitor_from_row(row: MonitorRow) -> Option<Monitor> {
    let id = row.id;
    match row.into_monitor() {
        Ok(monitor) => Some(monitor),
        Err(e) => {
            warn!(monitor_id = id, "Skipping malformed monitor definition: {}", e);
            None
        }
    }
}

#[async_trait]
impl Database for LibsqlDatabase {
    async fn list_monitors(&self, monitor_type: MonitorType) -> Result<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM monitors WHERE monitor_type = ? ORDER BY id", MONITOR_COLUMNS);
        let mut rows = conn.query(&sql, params![monitor_type.as_str()]).await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            if let Some(monitor) = monitor_from_row(MonitorRow::from_row(&row)?) {
                monitors.push(monitor);
            }
        }

        Ok(monitors)
    }

    async fn get_monitor(&self, id: i64) -> Result<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM monitors WHERE id = ?", MONITOR_COLUMNS);
        let mut rows = conn.query(&sql, params![id]).await?;

        match rows.next().await? {
            Some(row) => Ok(monitor_from_row(MonitorRow::from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn latest_outcome(&self, monitor_id: i64) -> Result<Option<ProbeOutcome>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT monitor_id, started_at, status, response_time_ms FROM monitor_logs WHERE monitor_id = ? ORDER BY started_at DESC, id DESC LIMIT 1",
                params![monitor_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(outcome_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn append_outcome(&self, outcome: &ProbeOutcome) -> Result<()> {
        let conn = self.get_conn().await?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO monitor_logs (monitor_id, started_at, status, response_time_ms, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                outcome.monitor_id,
                format_timestamp(outcome.started_at),
                outcome.status.as_str(),
                outcome.response_time_ms as i64,
                now.clone(),
                now
            ],
        )
        .await?;

        Ok(())
    }

    async fn list_pending_update_flags(&self) -> Result<Vec<i64>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT DISTINCT monitor_id FROM monitor_updates WHERE must_update = 1 ORDER BY monitor_id",
                (),
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<i64>(0)?);
        }

        Ok(ids)
    }

    async fn clear_update_flag(&self, monitor_id: i64) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.execute(
            "UPDATE monitor_updates SET must_update = 0, updated_at = ? WHERE monitor_id = ?",
            params![format_timestamp(Utc::now()), monitor_id],
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::fixtures::{NewMonitor, TestDatabase};
    use crate::monitoring::types::{MonitorKind, ProbeStatus};
    use chrono::{DateTime, TimeZone};

    fn outcome(monitor_id: i64, started_at: DateTime<Utc>, status: ProbeStatus) -> ProbeOutcome {
        ProbeOutcome { monitor_id, started_at, status, response_time_ms: 42 }
    }

    #[tokio::test]
    async fn test_list_monitors_by_type() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let ping = test_db.insert_monitor(&NewMonitor::ping("db", "127.0.0.1", 5432)).await?;
        let site = test_db.insert_monitor(&NewMonitor::website("home", "https://example.com")).await?;

        let pings = test_db.database.list_monitors(MonitorType::Ping).await?;
        assert_eq!(pings.len(), 1);
        assert_eq!(pings[0].id, ping);
        assert_eq!(pings[0].kind, MonitorKind::Ping { hostname: "127.0.0.1".to_string(), port: 5432 });

        let sites = test_db.database.list_monitors(MonitorType::Website).await?;
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, site);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let mut broken = NewMonitor::ping("broken", "", 80);
        broken.hostname = None;
        let broken_id = test_db.insert_monitor(&broken).await?;
        test_db.insert_monitor(&NewMonitor::ping("ok", "127.0.0.1", 80)).await?;

        let pings = test_db.database.list_monitors(MonitorType::Ping).await?;
        assert_eq!(pings.len(), 1);
        assert_eq!(test_db.database.get_monitor(broken_id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_monitor() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let id = test_db
            .insert_monitor(&NewMonitor::website("shop", "https://shop.example").with_keywords(r#"["Cart"]"#))
            .await?;

        let monitor = test_db.database.get_monitor(id).await?.expect("monitor exists");
        assert_eq!(monitor.label, "shop");
        match monitor.kind {
            MonitorKind::Website { keywords, .. } => assert_eq!(keywords, vec!["Cart".to_string()]),
            other => panic!("unexpected kind {:?}", other),
        }

        assert_eq!(test_db.database.get_monitor(id + 100).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_outcome_returns_most_recent() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let id = test_db.insert_monitor(&NewMonitor::ping("db", "127.0.0.1", 5432)).await?;

        assert_eq!(test_db.database.latest_outcome(id).await?, None);

        let earlier = outcome(id, Utc.with_ymd_and_hms(2025, 8, 1, 10, 0, 0).unwrap(), ProbeStatus::Failed);
        let later = outcome(id, Utc.with_ymd_and_hms(2025, 8, 1, 10, 0, 30).unwrap(), ProbeStatus::Succeeded);

        test_db.database.append_outcome(&earlier).await?;
        assert_eq!(test_db.database.latest_outcome(id).await?, Some(earlier.clone()));

        // Inserted out of order: start time decides, not insertion order
        test_db.database.append_outcome(&later).await?;
        test_db
            .database
            .append_outcome(&outcome(id, Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap(), ProbeStatus::Failed))
            .await?;
        assert_eq!(test_db.database.latest_outcome(id).await?, Some(later));
        Ok(())
    }

    #[tokio::test]
    async fn test_outcomes_are_per_monitor() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let a = test_db.insert_monitor(&NewMonitor::ping("a", "127.0.0.1", 1)).await?;
        let b = test_db.insert_monitor(&NewMonitor::ping("b", "127.0.0.1", 2)).await?;

        let for_a = outcome(a, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(), ProbeStatus::Succeeded);
        test_db.database.append_outcome(&for_a).await?;

        assert_eq!(test_db.database.latest_outcome(a).await?, Some(for_a));
        assert_eq!(test_db.database.latest_outcome(b).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_flags() -> Result<()> {
        let test_db = TestDatabase::new().await?;
        let a = test_db.insert_monitor(&NewMonitor::ping("a", "127.0.0.1", 1)).await?;
        let b = test_db.insert_monitor(&NewMonitor::ping("b", "127.0.0.1", 2)).await?;

        test_db.set_update_flag(b, true).await?;
        test_db.set_update_flag(a, true).await?;
        test_db.set_update_flag(a, true).await?;
        assert_eq!(test_db.database.list_pending_update_flags().await?, vec![a, b]);

        test_db.database.clear_update_flag(a).await?;
        assert_eq!(test_db.database.list_pending_update_flags().await?, vec![b]);

        // Clearing an absent flag is a no-op
        test_db.database.clear_update_flag(999).await?;
        assert_eq!(test_db.database.list_pending_update_flags().await?, vec![b]);
        Ok(())
    }
}
