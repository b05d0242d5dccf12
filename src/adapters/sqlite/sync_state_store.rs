//! SQLite adapter for the sync state store.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{from_json, parse_optional_datetime, to_json};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{SyncState, SyncStatus};
use crate::domain::ports::SyncStateStore;

#[derive(Clone)]
pub struct SqliteSyncStateStore {
    pool: SqlitePool,
}

impl SqliteSyncStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SyncStateRow {
    source_id: String,
    status: String,
    cursor: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    last_sync_at: Option<String>,
    stats: String,
    error: Option<String>,
}

fn row_to_state(row: SyncStateRow) -> CoreResult<SyncState> {
    let status = SyncStatus::from_str(&row.status)
        .ok_or_else(|| CoreError::Serialization(format!("unknown sync status {:?}", row.status)))?;
    Ok(SyncState {
        source_id: row.source_id,
        status,
        cursor: row.cursor,
        started_at: parse_optional_datetime(row.started_at)?,
        completed_at: parse_optional_datetime(row.completed_at)?,
        last_sync_at: parse_optional_datetime(row.last_sync_at)?,
        stats: from_json(&row.stats)?,
        error: row.error,
    })
}

#[async_trait]
impl SyncStateStore for SqliteSyncStateStore {
    async fn get(&self, source_id: &str) -> CoreResult<Option<SyncState>> {
        let row: Option<SyncStateRow> =
            sqlx::query_as("SELECT * FROM sync_states WHERE source_id = ?")
                .bind(source_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_state).transpose()
    }

    async fn upsert(&self, state: &SyncState) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO sync_states
             (source_id, status, cursor, started_at, completed_at, last_sync_at, stats, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (source_id) DO UPDATE SET
               status = excluded.status,
               cursor = excluded.cursor,
               started_at = excluded.started_at,
               completed_at = excluded.completed_at,
               last_sync_at = excluded.last_sync_at,
               stats = excluded.stats,
               error = excluded.error",
        )
        .bind(&state.source_id)
        .bind(state.status.as_str())
        .bind(&state.cursor)
        .bind(state.started_at.map(|dt| dt.to_rfc3339()))
        .bind(state.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(state.last_sync_at.map(|dt| dt.to_rfc3339()))
        .bind(to_json(&state.stats)?)
        .bind(&state.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, source_id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM sync_states WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
