//! SQLite adapter for the source store.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{from_json, parse_datetime, to_json};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{ProviderType, Source};
use crate::domain::ports::SourceStore;

#[derive(Clone)]
pub struct SqliteSourceStore {
    pool: SqlitePool,
}

impl SqliteSourceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    name: String,
    provider_type: String,
    config: String,
    installation_id: Option<String>,
    enabled: i64,
    selected_containers: String,
    created_at: String,
    updated_at: String,
}

fn row_to_source(row: SourceRow) -> CoreResult<Source> {
    let provider_type = ProviderType::from_str(&row.provider_type).ok_or_else(|| {
        CoreError::Serialization(format!("unknown provider type {:?}", row.provider_type))
    })?;
    Ok(Source {
        id: row.id,
        name: row.name,
        provider_type,
        config: from_json(&row.config)?,
        installation_id: row.installation_id,
        enabled: row.enabled != 0,
        selected_containers: from_json(&row.selected_containers)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl SourceStore for SqliteSourceStore {
    async fn create(&self, source: &Source) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO sources
             (id, name, provider_type, config, installation_id, enabled,
              selected_containers, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(source.provider_type.as_str())
        .bind(to_json(&source.config)?)
        .bind(&source.installation_id)
        .bind(i64::from(source.enabled))
        .bind(to_json(&source.selected_containers)?)
        .bind(source.created_at.to_rfc3339())
        .bind(source.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(CoreError::already_exists("source", source.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_source).transpose()
    }

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as("SELECT * FROM sources WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_source).transpose()
    }

    async fn list(&self) -> CoreResult<Vec<Source>> {
        let rows: Vec<SourceRow> = sqlx::query_as("SELECT * FROM sources ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_source).collect()
    }

    async fn update(&self, source: &Source) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE sources SET
             name = ?2, provider_type = ?3, config = ?4, installation_id = ?5,
             enabled = ?6, selected_containers = ?7, updated_at = ?8
             WHERE id = ?1",
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(source.provider_type.as_str())
        .bind(to_json(&source.config)?)
        .bind(&source.installation_id)
        .bind(i64::from(source.enabled))
        .bind(to_json(&source.selected_containers)?)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("source", source.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_by_installation(&self, installation_id: &str) -> CoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE installation_id = ?")
                .bind(installation_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}
