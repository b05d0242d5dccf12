//! SQLite adapter for the user store.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{parse_datetime, parse_optional_datetime};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{User, UserRole};
use crate::domain::ports::UserStore;

#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    team_id: String,
    active: i64,
    last_login: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_user(row: UserRow) -> CoreResult<User> {
    let role = UserRole::from_str(&row.role)
        .ok_or_else(|| CoreError::Serialization(format!("unknown role {:?}", row.role)))?;
    Ok(User {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        name: row.name,
        role,
        team_id: row.team_id,
        active: row.active != 0,
        last_login: parse_optional_datetime(row.last_login)?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, user: &User) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO users
             (id, email, password_hash, name, role, team_id, active,
              last_login, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.team_id)
        .bind(i64::from(user.active))
        .bind(user.last_login.map(|dt| dt.to_rfc3339()))
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(CoreError::already_exists("user", user.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> CoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET
             email = ?2, password_hash = ?3, name = ?4, role = ?5, team_id = ?6,
             active = ?7, last_login = ?8, updated_at = ?9
             WHERE id = ?1",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.team_id)
        .bind(i64::from(user.active))
        .bind(user.last_login.map(|dt| dt.to_rfc3339()))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("user", user.id.clone()));
        }
        Ok(())
    }

    async fn list(&self) -> CoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users ORDER BY email")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(row_to_user).collect()
    }
}
