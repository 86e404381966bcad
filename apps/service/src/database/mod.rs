/// Database layer
///
/// libsql (SQLite) persistence for targets and their status events. The
/// monitoring engine only sees it through `TargetStore` and `EventSink`; the
/// operator commands use the inherent methods on `LibsqlStore`.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::LibsqlStore;

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
