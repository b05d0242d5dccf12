//! Durable task queue port.
//!
//! At-least-once delivery: `ack` finalises success, `nack` returns the task
//! to the queue with the failure reason recorded. Handlers must tolerate
//! duplicate deliveries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::errors::CoreResult;
use crate::domain::models::{QueueStats, Task, TaskFilter};

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Add a task to the queue.
    async fn enqueue(&self, task: Task) -> CoreResult<String>;

    /// Add several tasks; partial failure aborts with the error.
    async fn enqueue_batch(&self, tasks: Vec<Task>) -> CoreResult<Vec<String>>;

    /// Claim the next pending task, blocking up to `timeout`.
    ///
    /// Returns `None` on timeout. The claimed task is marked running and its
    /// attempt counter incremented.
    async fn dequeue(&self, timeout: Duration) -> CoreResult<Option<Task>>;

    /// Finalise a successfully handled task.
    async fn ack(&self, task_id: &str) -> CoreResult<()>;

    /// Return a task to the queue with the failure reason recorded.
    async fn nack(&self, task_id: &str, reason: &str) -> CoreResult<()>;

    async fn get_task(&self, task_id: &str) -> CoreResult<Option<Task>>;

    async fn list_tasks(&self, filter: &TaskFilter) -> CoreResult<Vec<Task>>;

    /// Cancel a pending task. Running and terminal tasks are left alone.
    async fn cancel_task(&self, task_id: &str) -> CoreResult<()>;

    /// Remove terminal tasks older than the given instant. Returns the
    /// number removed.
    async fn purge(&self, older_than: DateTime<Utc>) -> CoreResult<u64>;

    async fn stats(&self) -> CoreResult<QueueStats>;

    /// Liveness check of the backing substrate.
    async fn ping(&self) -> CoreResult<()>;

    /// Release resources. Subsequent operations may fail.
    async fn close(&self) -> CoreResult<()>;
}
