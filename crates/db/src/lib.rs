pub mod migrate;
pub mod repo;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Open the show database. In-memory databases are shared by all pool
/// connections, so `":memory:"` works for tests.
pub async fn connect(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let opts = SqliteConnectOptions::from_str(db_path)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    tracing::debug!(db_path, "opening database");
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(opts)
        .await
}
