use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATABASE_PATH_VAR: &str = "CHECKER_DATABASE_PATH";
pub const DATABASE_URL_VAR: &str = "CHECKER_DATABASE_URL";
pub const DATABASE_AUTH_TOKEN_VAR: &str = "CHECKER_DATABASE_AUTH_TOKEN";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to write config {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("failed to parse config {path}: {source}")]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available, neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub checker: CheckerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Embedded database file, used when `url` is unset
    pub path: String,
    /// Remote libsql server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    pub pool_size: usize,
    /// Create the tables when they do not exist yet
    pub bootstrap_schema: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub tick_seconds: u64,
    pub refresh_seconds: u64,
    pub ping_timeout_seconds: u64,
    pub website_timeout_seconds: u64,
    pub max_concurrent_probes: usize,
    pub stats_interval_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "database/database.sqlite".into(),
            url: None,
            auth_token: None,
            pool_size: 4,
            bootstrap_schema: true,
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 5,
            refresh_seconds: 300,
            ping_timeout_seconds: 5,
            website_timeout_seconds: 10,
            max_concurrent_probes: 1,
            stats_interval_seconds: 60,
        }
    }
}

impl CheckerConfig {
    pub fn tick(&self) -> Duration {
        seconds(self.tick_seconds)
    }

    pub fn refresh_interval(&self) -> Duration {
        seconds(self.refresh_seconds)
    }

    pub fn ping_timeout(&self) -> Duration {
        seconds(self.ping_timeout_seconds)
    }

    pub fn website_timeout(&self) -> Duration {
        seconds(self.website_timeout_seconds)
    }

    pub fn stats_interval(&self) -> Duration {
        seconds(self.stats_interval_seconds)
    }

    pub fn max_concurrent_probes(&self) -> usize {
        self.max_concurrent_probes.max(1)
    }
}

/// Zero means "as often as possible", which is clamped to one second
fn seconds(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/monitor-checker/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("monitor-checker/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Database")?;
        match &self.database.url {
            Some(url) => write_1(f, "Remote URL", url)?,
            None => write_1(f, "Path", &self.database.path)?,
        }
        write_1(f, "Auth Token", &if self.database.auth_token.is_some() { "<set>" } else { "<none>" })?;
        write_1(f, "Pool Size", &self.database.pool_size)?;
        write_1(f, "Bootstrap Schema", &self.database.bootstrap_schema)?;

        write_title_1(f, "Checker")?;
        write_1(f, "Tick (s)", &self.checker.tick_seconds)?;
        write_1(f, "Refresh (s)", &self.checker.refresh_seconds)?;
        write_1(f, "Ping Timeout (s)", &self.checker.ping_timeout_seconds)?;
        write_1(f, "Website Timeout (s)", &self.checker.website_timeout_seconds)?;
        write_1(f, "Max Concurrent Probes", &self.checker.max_concurrent_probes)?;
        write_1(f, "Stats Interval (s)", &self.checker.stats_interval_seconds)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/monitor-checker/config.toml
    ///  or the specified path, with the name config.toml if one does not exist.
    /// Environment overrides are applied on top of the file.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let mut config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| Error::ParseFailed { path: config_path.clone(), source })?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.apply_env_overrides(|name| env::var(name).ok());
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| Error::WriteFailed { path: path.to_path_buf(), source })
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(path) = lookup(DATABASE_PATH_VAR) {
            self.database.path = path;
        }
        if let Some(url) = lookup(DATABASE_URL_VAR) {
            self.database.url = Some(url);
        }
        if let Some(token) = lookup(DATABASE_AUTH_TOKEN_VAR) {
            self.database.auth_token = Some(token);
        }
    }
}
