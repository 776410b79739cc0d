/// Database abstraction layer
///
/// The checker reads monitor definitions and update flags written by the web
/// application and appends probe outcomes. Everything goes through the
/// [`Database`] trait; [`LibsqlDatabase`] serves both an embedded file and a
/// remote libsql server.

pub mod migrations;
pub mod models;
pub mod repository;

#[cfg(test)]
pub mod fixtures;

pub use repository::{Database, LibsqlDatabase};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
