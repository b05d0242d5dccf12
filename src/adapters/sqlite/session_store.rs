//! SQLite adapter for the session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::parse_datetime;
use crate::domain::errors::CoreResult;
use crate::domain::models::Session;
use crate::domain::ports::SessionStore;

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    token: String,
    refresh_token: String,
    expires_at: String,
    created_at: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

fn row_to_session(row: SessionRow) -> CoreResult<Session> {
    Ok(Session {
        id: row.id,
        user_id: row.user_id,
        token: row.token,
        refresh_token: row.refresh_token,
        expires_at: parse_datetime(&row.expires_at)?,
        created_at: parse_datetime(&row.created_at)?,
        user_agent: row.user_agent,
        ip_address: row.ip_address,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self, session: &Session) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO sessions
             (id, user_id, token, refresh_token, expires_at, created_at, user_agent, ip_address)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token)
        .bind(&session.refresh_token)
        .bind(session.expires_at.to_rfc3339())
        .bind(session.created_at.to_rfc3339())
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_session).transpose()
    }

    async fn get_by_refresh_token(&self, refresh_token: &str) -> CoreResult<Option<Session>> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT * FROM sessions WHERE refresh_token = ?")
                .bind(refresh_token)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_session).transpose()
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_user(&self, user_id: &str) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
