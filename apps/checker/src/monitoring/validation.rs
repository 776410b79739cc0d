//! Sanity checks applied to monitor definitions when they are loaded.
//!
//! Definitions come from the web application; a row that cannot be probed
//! at all is skipped with a warning instead of producing endless failures.

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("unknown monitor type '{0}'")]
    UnknownType(String),

    #[error("ping monitor has no hostname")]
    MissingHostname,

    #[error("ping monitor port {0:?} is not in 1-65535")]
    InvalidPort(Option<i64>),

    #[error("website monitor has no url")]
    MissingUrl,

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Validate the host/port pair of a ping monitor
pub fn validate_ping_target(
    hostname: Option<&str>,
    port: Option<i64>,
) -> Result<(String, u16), DefinitionError> {
    let hostname = hostname.map(str::trim).filter(|host| !host.is_empty()).ok_or(DefinitionError::MissingHostname)?;

    let port = port
        .filter(|port| (1..=u16::MAX as i64).contains(port))
        .ok_or(DefinitionError::InvalidPort(port))? as u16;

    Ok((hostname.to_string(), port))
}

/// Validate the target of a website monitor
pub fn validate_website_url(url: Option<&str>) -> Result<String, DefinitionError> {
    let raw = url.map(str::trim).filter(|url| !url.is_empty()).ok_or(DefinitionError::MissingUrl)?;

    let parsed = Url::parse(raw)
        .map_err(|e| DefinitionError::InvalidUrl { url: raw.to_string(), reason: e.to_string() })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DefinitionError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            });
        }
    }

    if parsed.host_str().is_none() {
        return Err(DefinitionError::InvalidUrl { url: raw.to_string(), reason: "missing host".to_string() });
    }

    Ok(raw.to_string())
}
