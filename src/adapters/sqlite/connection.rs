//! SQLite connection management.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::domain::errors::{CoreError, CoreResult};

/// Pool wrapper with WAL mode and embedded migrations.
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (and create if missing) the database at `path`.
    pub async fn open(path: &str, max_connections: u32) -> CoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
            .map_err(|err| CoreError::Storage(format!("bad database path {path:?}: {err}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!(path, "database opened");
        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> CoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Apply the embedded schema.
    pub async fn migrate(&self) -> CoreResult<()> {
        super::migrations::run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
