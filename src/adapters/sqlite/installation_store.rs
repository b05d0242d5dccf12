//! SQLite adapter for the installation store.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{from_json, parse_datetime, parse_optional_datetime, to_json};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{Installation, ProviderType};
use crate::domain::ports::InstallationStore;

#[derive(Clone)]
pub struct SqliteInstallationStore {
    pool: SqlitePool,
}

impl SqliteInstallationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InstallationRow {
    id: String,
    name: String,
    provider_type: String,
    auth_method: String,
    account_id: String,
    access_token: String,
    refresh_token: Option<String>,
    oauth_expiry: Option<String>,
    scopes: String,
    created_at: String,
    updated_at: String,
}

fn row_to_installation(row: InstallationRow) -> CoreResult<Installation> {
    let provider_type = ProviderType::from_str(&row.provider_type).ok_or_else(|| {
        CoreError::Serialization(format!("unknown provider type {:?}", row.provider_type))
    })?;
    Ok(Installation {
        id: row.id,
        name: row.name,
        provider_type,
        auth_method: row.auth_method,
        account_id: row.account_id,
        access_token: row.access_token,
        refresh_token: row.refresh_token,
        oauth_expiry: parse_optional_datetime(row.oauth_expiry)?,
        scopes: from_json(&row.scopes)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl InstallationStore for SqliteInstallationStore {
    async fn create(&self, installation: &Installation) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO installations
             (id, name, provider_type, auth_method, account_id, access_token,
              refresh_token, oauth_expiry, scopes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&installation.id)
        .bind(&installation.name)
        .bind(installation.provider_type.as_str())
        .bind(&installation.auth_method)
        .bind(&installation.account_id)
        .bind(&installation.access_token)
        .bind(&installation.refresh_token)
        .bind(installation.oauth_expiry.map(|dt| dt.to_rfc3339()))
        .bind(to_json(&installation.scopes)?)
        .bind(installation.created_at.to_rfc3339())
        .bind(installation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(CoreError::already_exists(
                    "installation",
                    format!("{}/{}", installation.provider_type, installation.account_id),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Installation>> {
        let row: Option<InstallationRow> =
            sqlx::query_as("SELECT * FROM installations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_installation).transpose()
    }

    async fn get_by_account(
        &self,
        provider_type: ProviderType,
        account_id: &str,
    ) -> CoreResult<Option<Installation>> {
        let row: Option<InstallationRow> = sqlx::query_as(
            "SELECT * FROM installations WHERE provider_type = ?1 AND account_id = ?2",
        )
        .bind(provider_type.as_str())
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_installation).transpose()
    }

    async fn list(&self) -> CoreResult<Vec<Installation>> {
        let rows: Vec<InstallationRow> =
            sqlx::query_as("SELECT * FROM installations ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(row_to_installation).collect()
    }

    async fn update(&self, installation: &Installation) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE installations SET
             name = ?2, auth_method = ?3, access_token = ?4, refresh_token = ?5,
             oauth_expiry = ?6, scopes = ?7, updated_at = ?8
             WHERE id = ?1",
        )
        .bind(&installation.id)
        .bind(&installation.name)
        .bind(&installation.auth_method)
        .bind(&installation.access_token)
        .bind(&installation.refresh_token)
        .bind(installation.oauth_expiry.map(|dt| dt.to_rfc3339()))
        .bind(to_json(&installation.scopes)?)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("installation", installation.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM installations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
