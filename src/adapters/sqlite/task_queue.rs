//! SQLite-backed durable task queue.
//!
//! At-least-once delivery over a single table: a claim is one atomic
//! `UPDATE ... RETURNING` that flips the oldest pending row to running and
//! bumps its attempt counter. Blocking dequeues poll with a short sleep
//! until the timeout elapses; nacks flip the row back to pending with the
//! reason recorded.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{from_json, parse_datetime, to_json};
use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{QueueStats, Task, TaskFilter, TaskStatus, TaskType};
use crate::domain::ports::TaskQueue;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct SqliteTaskQueue {
    pool: SqlitePool,
}

impl SqliteTaskQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn try_claim(&self) -> CoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "UPDATE tasks
             SET status = 'running', attempts = attempts + 1, updated_at = ?1
             WHERE id = (
                 SELECT id FROM tasks WHERE status = 'pending'
                 ORDER BY created_at LIMIT 1
             )
             RETURNING *",
        )
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_task).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    task_type: String,
    team_id: Option<String>,
    payload: String,
    status: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_task(row: TaskRow) -> CoreResult<Task> {
    let status = TaskStatus::from_str(&row.status)
        .ok_or_else(|| CoreError::Serialization(format!("unknown task status {:?}", row.status)))?;
    Ok(Task {
        id: row.id,
        task_type: TaskType::from_str(&row.task_type),
        team_id: row.team_id,
        payload: from_json(&row.payload)?,
        status,
        attempts: row.attempts as u32,
        last_error: row.last_error,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, task: Task) -> CoreResult<String> {
        sqlx::query(
            "INSERT INTO tasks
             (id, task_type, team_id, payload, status, attempts, last_error,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', 0, NULL, ?5, ?6)",
        )
        .bind(&task.id)
        .bind(task.task_type.as_str())
        .bind(&task.team_id)
        .bind(to_json(&task.payload)?)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(task.id)
    }

    async fn enqueue_batch(&self, tasks: Vec<Task>) -> CoreResult<Vec<String>> {
        let mut ids = Vec::with_capacity(tasks.len());
        let mut tx = self.pool.begin().await?;
        for task in &tasks {
            sqlx::query(
                "INSERT INTO tasks
                 (id, task_type, team_id, payload, status, attempts, last_error,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 0, NULL, ?5, ?6)",
            )
            .bind(&task.id)
            .bind(task.task_type.as_str())
            .bind(&task.team_id)
            .bind(to_json(&task.payload)?)
            .bind(task.created_at.to_rfc3339())
            .bind(task.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            ids.push(task.id.clone());
        }
        tx.commit().await?;
        Ok(ids)
    }

    async fn dequeue(&self, timeout: Duration) -> CoreResult<Option<Task>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(task) = self.try_claim().await? {
                return Ok(Some(task));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ack(&self, task_id: &str) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'completed', updated_at = ?2 WHERE id = ?1",
        )
        .bind(task_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("task", task_id.to_string()));
        }
        Ok(())
    }

    async fn nack(&self, task_id: &str, reason: &str) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'pending', last_error = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(task_id)
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("task", task_id.to_string()));
        }
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> CoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_task).transpose()
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> CoreResult<Vec<Task>> {
        // Filters compose as optional equality constraints.
        let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.task_type.is_some() {
            sql.push_str(" AND task_type = ?");
        }
        sql.push_str(" ORDER BY created_at");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, TaskRow>(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(task_type) = &filter.task_type {
            query = query.bind(task_type.as_str().to_string());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_task).collect()
    }

    async fn cancel_task(&self, task_id: &str) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = 'cancelled', updated_at = ?2
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(task_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either missing or not pending; report which.
            return match self.get_task(task_id).await? {
                None => Err(CoreError::not_found("task", task_id.to_string())),
                Some(task) => Err(CoreError::InvalidInput(format!(
                    "task {} is {} and cannot be cancelled",
                    task_id,
                    task.status.as_str()
                ))),
            };
        }
        Ok(())
    }

    async fn purge(&self, older_than: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM tasks
             WHERE status IN ('completed', 'cancelled') AND updated_at < ?",
        )
        .bind(older_than.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> CoreResult<QueueStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            let count = count as u64;
            match TaskStatus::from_str(&status) {
                Some(TaskStatus::Pending) => stats.pending = count,
                Some(TaskStatus::Running) => stats.running = count,
                Some(TaskStatus::Completed) => stats.completed = count,
                Some(TaskStatus::Failed) => stats.failed = count,
                Some(TaskStatus::Cancelled) => stats.cancelled = count,
                None => {}
            }
        }
        Ok(stats)
    }

    async fn ping(&self) -> CoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&self) -> CoreResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
