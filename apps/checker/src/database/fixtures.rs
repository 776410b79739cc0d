//! Test helpers standing in for the web application: they write monitors and
//! update flags the way it does.

use anyhow::Result;
use chrono::Utc;
use libsql::params;
use std::sync::Arc;
use tempfile::TempDir;

use super::models::format_timestamp;
use super::{LibsqlDatabase, initialize_database};
use crate::pool::{LibsqlPool, build_pool};

/// Monitor definition as the web application would insert it
#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub label: String,
    pub periodicity: Option<i64>,
    pub monitor_type: String,
    pub hostname: Option<String>,
    pub port: Option<i64>,
    pub url: Option<String>,
    pub check_status: bool,
    pub keywords: Option<String>,
}

impl NewMonitor {
    pub fn ping(label: &str, hostname: &str, port: u16) -> Self {
        Self {
            label: label.to_string(),
            periodicity: Some(30),
            monitor_type: "ping".to_string(),
            hostname: Some(hostname.to_string()),
            port: Some(port as i64),
            url: None,
            check_status: false,
            keywords: None,
        }
    }

    pub fn website(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            periodicity: Some(60),
            monitor_type: "website".to_string(),
            hostname: None,
            port: None,
            url: Some(url.to_string()),
            check_status: false,
            keywords: None,
        }
    }

    pub fn with_periodicity(mut self, seconds: i64) -> Self {
        self.periodicity = Some(seconds);
        self
    }

    pub fn with_keywords(mut self, raw_json: &str) -> Self {
        self.keywords = Some(raw_json.to_string());
        self
    }

    pub fn enforcing_status(mut self) -> Self {
        self.check_status = true;
        self
    }
}

/// Throwaway on-disk database with the schema applied
pub struct TestDatabase {
    pub database: Arc<LibsqlDatabase>,
    pub pool: LibsqlPool,
    // Keeps the directory alive for the lifetime of the test
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("checker.db");

        let db = libsql::Builder::new_local(&path).build().await?;
        let pool = build_pool(db, 2)?;

        let conn = pool.get().await?;
        initialize_database(&conn).await?;
        drop(conn);

        Ok(Self { database: Arc::new(LibsqlDatabase::new(pool.clone())), pool, _dir: dir })
    }

    pub async fn insert_monitor(&self, monitor: &NewMonitor) -> Result<i64> {
        let conn = self.pool.get().await?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO monitors (label, periodicity, monitor_type, hostname, port, url, check_status, keywords, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                monitor.label.clone(),
                monitor.periodicity,
                monitor.monitor_type.clone(),
                monitor.hostname.clone(),
                monitor.port,
                monitor.url.clone(),
                if monitor.check_status { 1 } else { 0 },
                monitor.keywords.clone(),
                now.clone(),
                now
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    pub async fn update_monitor(&self, id: i64, monitor: &NewMonitor) -> Result<()> {
        let conn = self.pool.get().await?;

        conn.execute(
            "UPDATE monitors SET label = ?, periodicity = ?, monitor_type = ?, hostname = ?, port = ?, url = ?, check_status = ?, keywords = ?, updated_at = ? WHERE id = ?",
            params![
                monitor.label.clone(),
                monitor.periodicity,
                monitor.monitor_type.clone(),
                monitor.hostname.clone(),
                monitor.port,
                monitor.url.clone(),
                if monitor.check_status { 1 } else { 0 },
                monitor.keywords.clone(),
                format_timestamp(Utc::now()),
                id
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn delete_monitor(&self, id: i64) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.execute("DELETE FROM monitors WHERE id = ?", params![id]).await?;
        Ok(())
    }

    pub async fn set_update_flag(&self, monitor_id: i64, must_update: bool) -> Result<()> {
        let conn = self.pool.get().await?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO monitor_updates (monitor_id, must_update, created_at, updated_at) VALUES (?, ?, ?, ?)",
            params![monitor_id, if must_update { 1 } else { 0 }, now.clone(), now],
        )
        .await?;

        Ok(())
    }

    /// Raise a flag for an id that has no monitor row, as a store without
    /// foreign key enforcement allows
    pub async fn insert_orphan_update_flag(&self, monitor_id: i64) -> Result<()> {
        let conn = self.pool.get().await?;
        let now = format_timestamp(Utc::now());

        conn.execute_batch("PRAGMA foreign_keys = OFF;").await?;
        let inserted = conn
            .execute(
                "INSERT INTO monitor_updates (monitor_id, must_update, created_at, updated_at) VALUES (?, 1, ?, ?)",
                params![monitor_id, now.clone(), now],
            )
            .await;
        conn.execute_batch("PRAGMA foreign_keys = ON;").await?;
        inserted?;

        Ok(())
    }

    /// Write a log row verbatim, bypassing the typed outcome
    pub async fn insert_raw_outcome(&self, monitor_id: i64, started_at: &str, status: &str) -> Result<()> {
        let conn = self.pool.get().await?;
        let now = format_timestamp(Utc::now());

        conn.execute(
            "INSERT INTO monitor_logs (monitor_id, started_at, status, response_time_ms, created_at, updated_at) VALUES (?, ?, ?, 0, ?, ?)",
            params![monitor_id, started_at.to_string(), status.to_string(), now.clone(), now],
        )
        .await?;

        Ok(())
    }

    pub async fn count_outcomes(&self, monitor_id: i64) -> Result<i64> {
        let conn = self.pool.get().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM monitor_logs WHERE monitor_id = ?", params![monitor_id])
            .await?;

        Ok(rows.next().await?.map(|row| row.get::<i64>(0)).transpose()?.unwrap_or_default())
    }
}
