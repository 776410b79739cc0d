use anyhow::{Result, anyhow};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Default connect budget of a ping check
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);
/// Default total budget of a website check
pub const WEBSITE_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single network check observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Wall-clock duration of the attempt
    pub elapsed: Duration,

    /// HTTP status code (website checks that reached the server)
    pub status_code: Option<u16>,

    /// Why the check failed, `None` when it passed
    pub failure: Option<String>,
}

impl CheckReport {
    fn passed(elapsed: Duration, status_code: Option<u16>) -> Self {
        Self { elapsed, status_code, failure: None }
    }

    fn failed(elapsed: Duration, status_code: Option<u16>, reason: impl Into<String>) -> Self {
        Self { elapsed, status_code, failure: Some(reason.into()) }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// TCP connect checker
pub struct PingChecker {
    timeout_duration: Duration,
}

impl PingChecker {
    pub fn new(timeout_duration: Duration) -> Self {
        Self { timeout_duration }
    }

    /// Open a connection to `hostname:port` and close it right away.
    ///
    /// Name resolution is part of the attempt and shares its timeout.
    pub async fn check(&self, hostname: &str, port: u16) -> CheckReport {
        let start = Instant::now();

        let connect = tokio::net::TcpStream::connect((hostname, port));
        let result = timeout(self.timeout_duration, connect).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(stream)) => {
                drop(stream);
                CheckReport::passed(elapsed, None)
            }
            Ok(Err(e)) => CheckReport::failed(elapsed, None, format!("TCP connection failed: {}", e)),
            Err(_) => CheckReport::failed(elapsed, None, "TCP connection timeout"),
        }
    }
}

/// HTTP/HTTPS content checker
pub struct WebsiteChecker {
    client: reqwest::Client,
}

impl WebsiteChecker {
    pub fn new(timeout_duration: Duration) -> Result<Self> {
        // Self-signed endpoints must stay checkable.
        let client = reqwest::Client::builder()
            .timeout(timeout_duration)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("monitor-checker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client })
    }

    /// GET `url` and validate the response against the monitor's rules
    pub async fn check(&self, url: &str, enforce_status: bool, keywords: &[String]) -> CheckReport {
        let start = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return CheckReport::failed(start.elapsed(), None, describe_request_error(&e)),
        };

        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return CheckReport::failed(start.elapsed(), Some(status_code), describe_request_error(&e));
            }
        };
        let elapsed = start.elapsed();

        match evaluate_response(status_code, &body, enforce_status, keywords) {
            Ok(()) => CheckReport::passed(elapsed, Some(status_code)),
            Err(reason) => CheckReport::failed(elapsed, Some(status_code), reason),
        }
    }
}

fn describe_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "HTTP request timed out".to_string()
    } else if error.is_connect() {
        format!("HTTP connection failed: {}", error)
    } else {
        format!("HTTP request failed: {}", error)
    }
}

/// Apply the status and keyword rules to a received response.
///
/// The keyword scan only runs when the status rule did not already fail.
pub fn evaluate_response(
    status_code: u16,
    body: &str,
    enforce_status: bool,
    keywords: &[String],
) -> std::result::Result<(), String> {
    if enforce_status && !(200..300).contains(&status_code) {
        return Err(format!("HTTP status code {} not in range [200, 300)", status_code));
    }

    let missing: Vec<&str> = keywords
        .iter()
        .map(String::as_str)
        .filter(|keyword| !keyword.is_empty() && !body.contains(keyword))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing keywords: {}", missing.join(", ")))
    }
}

/// Milliseconds rounded to the nearest integer
pub fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
