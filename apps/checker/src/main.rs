mod config;
mod database;
mod error;
mod monitoring;
mod pool;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};

use config::{Config, DatabaseConfig};
use database::{Database, LibsqlDatabase, initialize_database};
use error::AppError;
use monitoring::{CheckRunner, MonitorRegistry, MonitoringScheduler, ProbeExecutor, SchedulerSettings};
use pool::{LibsqlPool, build_pool};

#[derive(Parser, Debug)]
#[command(author, version, about = "Uptime checker for ping and website monitors", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    logger::init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_config(cli.config.as_ref())?;
    debug!("{}", config);

    let pool = open_pool(&config.database).await.map_err(AppError::StorageUnavailable)?;

    if config.database.bootstrap_schema {
        info!("Initializing database schema...");
        let conn = pool.get().await.map_err(|e| AppError::StorageUnavailable(e.into()))?;
        initialize_database(&conn).await.map_err(AppError::Schema)?;
    }

    let database: Arc<dyn Database> = Arc::new(LibsqlDatabase::new(pool));

    let executor = ProbeExecutor::new(config.checker.ping_timeout(), config.checker.website_timeout())
        .map_err(AppError::Executor)?;
    let runner = Arc::new(CheckRunner::new(executor, database.clone()));

    let mut registry = MonitorRegistry::new(database, runner.clone(), config.checker.refresh_interval());
    registry.load().await.map_err(AppError::InitialLoad)?;

    let settings = SchedulerSettings {
        tick: config.checker.tick(),
        max_concurrent_probes: config.checker.max_concurrent_probes(),
        stats_interval: config.checker.stats_interval(),
    };
    info!(
        "Checker running: tick {}s, refresh {}s, up to {} probes at once",
        settings.tick.as_secs(),
        config.checker.refresh_interval().as_secs(),
        settings.max_concurrent_probes
    );

    MonitoringScheduler::new(registry, runner, settings).run().await;
    Ok(())
}

/// Open the configured database and make sure it answers
async fn open_pool(settings: &DatabaseConfig) -> anyhow::Result<LibsqlPool> {
    let database = match &settings.url {
        Some(url) => {
            info!("Connecting to remote database {}", url);
            libsql::Builder::new_remote(url.clone(), settings.auth_token.clone().unwrap_or_default())
                .build()
                .await
                .with_context(|| format!("cannot open {}", url))?
        }
        None => {
            let path = Path::new(&settings.path);
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }

            info!("Opening database {}", path.display());
            libsql::Builder::new_local(path)
                .build()
                .await
                .with_context(|| format!("cannot open {}", path.display()))?
        }
    };

    let pool = build_pool(database, settings.pool_size)?;

    let conn = pool.get().await.context("cannot get a connection")?;
    conn.query("SELECT 1", ()).await.context("database does not answer")?;

    Ok(pool)
}
