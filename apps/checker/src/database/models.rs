use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::Row;

use crate::monitoring::types::{
    Monitor, MonitorKind, MonitorType, ProbeOutcome, ProbeStatus, clamp_periodicity, parse_keywords,
};
use crate::monitoring::validation::{DefinitionError, validate_ping_target, validate_website_url};

/// Storage format of every timestamp column (always UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns selected by every monitor query, in [`MonitorRow::from_row`] order
pub const MONITOR_COLUMNS: &str =
    "id, label, periodicity, monitor_type, hostname, port, url, check_status, keywords";

/// Render a UTC timestamp the way the web application stores it
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp as UTC, whatever the local timezone is.
///
/// Fractional seconds and RFC 3339 values are accepted too.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| anyhow!("Invalid timestamp '{}': {}", raw, e))
}

/// A `monitors` row exactly as stored
#[derive(Debug, Clone, Default)]
pub struct MonitorRow {
    pub id: i64,
    pub label: String,
    pub periodicity: Option<i64>,
    pub monitor_type: String,
    pub hostname: Option<String>,
    pub port: Option<i64>,
    pub url: Option<String>,
    pub check_status: Option<i64>,
    pub keywords: Option<String>,
}

impl MonitorRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            label: row.get::<Option<String>>(1)?.unwrap_or_default(),
            periodicity: row.get(2)?,
            monitor_type: row.get::<Option<String>>(3)?.unwrap_or_default(),
            hostname: row.get(4)?,
            port: row.get(5)?,
            url: row.get(6)?,
            check_status: row.get(7)?,
            keywords: row.get(8)?,
        })
    }

    /// Build the typed definition, keeping only the fields of its kind
    pub fn into_monitor(self) -> std::result::Result<Monitor, DefinitionError> {
        let monitor_type = MonitorType::parse(&self.monitor_type)
            .ok_or_else(|| DefinitionError::UnknownType(self.monitor_type.clone()))?;

        let kind = match monitor_type {
            MonitorType::Ping => {
                let (hostname, port) = validate_ping_target(self.hostname.as_deref(), self.port)?;
                MonitorKind::Ping { hostname, port }
            }
            MonitorType::Website => MonitorKind::Website {
                url: validate_website_url(self.url.as_deref())?,
                enforce_status: self.check_status.unwrap_or(0) != 0,
                keywords: parse_keywords(self.keywords.as_deref()),
            },
        };

        if let Some(raw) = self.periodicity {
            if clamp_periodicity(Some(raw)) as i64 != raw {
                tracing::warn!(
                    monitor_id = self.id,
                    "Periodicity {}s outside supported range, clamped to {}s",
                    raw,
                    clamp_periodicity(Some(raw))
                );
            }
        }

        Ok(Monitor {
            id: self.id,
            label: self.label,
            periodicity: clamp_periodicity(self.periodicity),
            kind,
        })
    }
}

/// A `monitor_logs` row
pub fn outcome_from_row(row: &Row) -> Result<ProbeOutcome> {
    let monitor_id: i64 = row.get(0)?;
    let started_at: String = row.get(1)?;
    let status: String = row.get(2)?;
    let response_time_ms: i64 = row.get(3)?;

    Ok(ProbeOutcome {
        monitor_id,
        started_at: parse_timestamp(&started_at)?,
        status: ProbeStatus::parse(&status)
            .ok_or_else(|| anyhow!("Unknown status '{}' in monitor_logs", status))?,
        response_time_ms: response_time_ms.max(0) as u64,
    })
}
