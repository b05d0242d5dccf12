//! SQLite adapter for the scheduled task store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_json, parse_datetime, parse_optional_datetime, to_json};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{ScheduledTask, TaskType};
use crate::domain::ports::ScheduleStore;

#[derive(Clone)]
pub struct SqliteScheduleStore {
    pool: SqlitePool,
}

impl SqliteScheduleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: String,
    name: String,
    task_type: String,
    team_id: Option<String>,
    interval_secs: i64,
    enabled: i64,
    payload: String,
    next_run: String,
    last_run: Option<String>,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_schedule(row: ScheduleRow) -> CoreResult<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.id,
        name: row.name,
        task_type: TaskType::from_str(&row.task_type),
        team_id: row.team_id,
        interval_secs: row.interval_secs as u64,
        enabled: row.enabled != 0,
        payload: from_json(&row.payload)?,
        next_run: parse_datetime(&row.next_run)?,
        last_run: parse_optional_datetime(row.last_run)?,
        last_error: row.last_error,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl ScheduleStore for SqliteScheduleStore {
    async fn create(&self, schedule: &ScheduledTask) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO scheduled_tasks
             (id, name, task_type, team_id, interval_secs, enabled, payload,
              next_run, last_run, last_error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&schedule.id)
        .bind(&schedule.name)
        .bind(schedule.task_type.as_str())
        .bind(&schedule.team_id)
        .bind(schedule.interval_secs as i64)
        .bind(i64::from(schedule.enabled))
        .bind(to_json(&schedule.payload)?)
        .bind(schedule.next_run.to_rfc3339())
        .bind(schedule.last_run.map(|dt| dt.to_rfc3339()))
        .bind(&schedule.last_error)
        .bind(schedule.created_at.to_rfc3339())
        .bind(schedule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(CoreError::already_exists("scheduled task", schedule.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledTask>> {
        let row: Option<ScheduleRow> =
            sqlx::query_as("SELECT * FROM scheduled_tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_schedule).transpose()
    }

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<ScheduledTask>> {
        let row: Option<ScheduleRow> =
            sqlx::query_as("SELECT * FROM scheduled_tasks WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        row.map(row_to_schedule).transpose()
    }

    async fn list(&self) -> CoreResult<Vec<ScheduledTask>> {
        let rows: Vec<ScheduleRow> =
            sqlx::query_as("SELECT * FROM scheduled_tasks ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(row_to_schedule).collect()
    }

    async fn get_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<ScheduledTask>> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT * FROM scheduled_tasks
             WHERE enabled = 1 AND next_run <= ?
             ORDER BY next_run",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_schedule).collect()
    }

    async fn update(&self, schedule: &ScheduledTask) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE scheduled_tasks SET
             name = ?2, task_type = ?3, team_id = ?4, interval_secs = ?5,
             enabled = ?6, payload = ?7, next_run = ?8, last_run = ?9,
             last_error = ?10, updated_at = ?11
             WHERE id = ?1",
        )
        .bind(&schedule.id)
        .bind(&schedule.name)
        .bind(schedule.task_type.as_str())
        .bind(&schedule.team_id)
        .bind(schedule.interval_secs as i64)
        .bind(i64::from(schedule.enabled))
        .bind(to_json(&schedule.payload)?)
        .bind(schedule.next_run.to_rfc3339())
        .bind(schedule.last_run.map(|dt| dt.to_rfc3339()))
        .bind(&schedule.last_error)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("scheduled task", schedule.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
