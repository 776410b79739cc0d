use thiserror::Error;

use crate::config;

/// Startup failures, each rendered as one line before the process exits
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Storage unavailable: {0:#}")]
    StorageUnavailable(anyhow::Error),
    #[error("Schema bootstrap failed: {0:#}")]
    Schema(anyhow::Error),
    #[error("Initial monitor load failed: {0:#}")]
    InitialLoad(anyhow::Error),
    #[error("Probe executor setup failed: {0:#}")]
    Executor(anyhow::Error),
}
