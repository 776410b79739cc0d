use chrono::{DateTime, Utc};

/// Shortest allowed interval between two checks of one monitor, in seconds
pub const MIN_PERIODICITY: u32 = 5;
/// Longest allowed interval between two checks of one monitor, in seconds
pub const MAX_PERIODICITY: u32 = 300;
/// Used when a stored definition carries no periodicity at all
pub const DEFAULT_PERIODICITY: u32 = 300;

/// Persisted discriminator of a monitor definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorType {
    Ping,
    Website,
}

impl MonitorType {
    pub const ALL: [MonitorType; 2] = [MonitorType::Ping, MonitorType::Website];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Ping => "ping",
            MonitorType::Website => "website",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ping" => Some(MonitorType::Ping),
            "website" => Some(MonitorType::Website),
            _ => None,
        }
    }
}

impl std::fmt::Display for MonitorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific part of a monitor definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorKind {
    /// TCP reachability of `hostname:port`
    Ping { hostname: String, port: u16 },

    /// HTTP GET of `url`, optionally validating status and body
    Website {
        url: String,
        enforce_status: bool,
        keywords: Vec<String>,
    },
}

impl MonitorKind {
    pub fn monitor_type(&self) -> MonitorType {
        match self {
            MonitorKind::Ping { .. } => MonitorType::Ping,
            MonitorKind::Website { .. } => MonitorType::Website,
        }
    }

    /// Human readable target, used in logs
    pub fn target(&self) -> String {
        match self {
            MonitorKind::Ping { hostname, port } => format!("{hostname}:{port}"),
            MonitorKind::Website { url, .. } => url.clone(),
        }
    }
}

/// A check definition as owned by the web application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub id: i64,
    pub label: String,

    /// Seconds between two due times, always within
    /// [`MIN_PERIODICITY`, `MAX_PERIODICITY`]
    pub periodicity: u32,

    pub kind: MonitorKind,
}

impl Monitor {
    pub fn monitor_type(&self) -> MonitorType {
        self.kind.monitor_type()
    }
}

/// Clamp a stored periodicity into the supported range
pub fn clamp_periodicity(raw: Option<i64>) -> u32 {
    match raw {
        None => DEFAULT_PERIODICITY,
        Some(value) => value.clamp(MIN_PERIODICITY as i64, MAX_PERIODICITY as i64) as u32,
    }
}

/// Decode the persisted keyword list.
///
/// Anything that is not a JSON array degrades to an empty list; non-string
/// elements and empty strings are dropped.
pub fn parse_keywords(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(keyword) if !keyword.is_empty() => Some(keyword),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Result of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Succeeded,
    Failed,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Succeeded => "succeeded",
            ProbeStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "succeeded" => Some(ProbeStatus::Succeeded),
            "failed" => Some(ProbeStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// ID of the monitor that was checked
    pub monitor_id: i64,

    /// When the probe started, truncated to whole seconds
    pub started_at: DateTime<Utc>,

    pub status: ProbeStatus,

    /// Wall-clock duration of the probe, rounded to the nearest millisecond
    pub response_time_ms: u64,
}

impl ProbeOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == ProbeStatus::Succeeded
    }
}

/// Daemon-local schedule state of one monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub monitor: Monitor,
    pub next_check: DateTime<Utc>,
}

impl ScheduleEntry {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_check <= now
    }
}
