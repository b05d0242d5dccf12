//! In-memory task queue.
//!
//! At-least-once semantics over a mutex-guarded map plus a FIFO of pending
//! ids. Blocking dequeues park on a `Notify` until work arrives or the
//! timeout elapses. Nacked tasks requeue immediately with the reason
//! recorded; retry pacing is left to callers.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{QueueStats, Task, TaskFilter, TaskStatus};
use crate::domain::ports::TaskQueue;

#[derive(Default)]
struct QueueInner {
    tasks: HashMap<String, Task>,
    pending: VecDeque<String>,
    closed: bool,
}

/// Mutex-backed queue with blocking dequeue.
#[derive(Default)]
pub struct MemoryTaskQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl MemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    async fn try_claim(&self) -> CoreResult<Option<Task>> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(CoreError::Storage("queue is closed".to_string()));
        }
        while let Some(id) = inner.pending.pop_front() {
            if let Some(task) = inner.tasks.get_mut(&id) {
                if task.status != TaskStatus::Pending {
                    continue;
                }
                task.status = TaskStatus::Running;
                task.attempts += 1;
                task.updated_at = Utc::now();
                return Ok(Some(task.clone()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> CoreResult<String> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(CoreError::Storage("queue is closed".to_string()));
        }
        let id = task.id.clone();
        inner.pending.push_back(id.clone());
        inner.tasks.insert(id.clone(), task);
        drop(inner);
        self.notify.notify_one();
        Ok(id)
    }

    async fn enqueue_batch(&self, tasks: Vec<Task>) -> CoreResult<Vec<String>> {
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            ids.push(self.enqueue(task).await?);
        }
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
            // Wake on new work or give up at the deadline.
            let _ = tokio::time::timeout_at(deadline, self.notify.notified()).await;
        }
    }

    async fn ack(&self, task_id: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(task) = inner.tasks.get_mut(task_id) else {
            return Err(CoreError::not_found("task", task_id.to_string()));
        };
        task.status = TaskStatus::Completed;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn nack(&self, task_id: &str, reason: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(task) = inner.tasks.get_mut(task_id) else {
            return Err(CoreError::not_found("task", task_id.to_string()));
        };
        task.status = TaskStatus::Pending;
        task.last_error = Some(reason.to_string());
        task.updated_at = Utc::now();
        let id = task.id.clone();
        inner.pending.push_back(id);
        drop(inner);
        self.notify.notify_one();
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> CoreResult<Option<Task>> {
        Ok(self.inner.lock().await.tasks.get(task_id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> CoreResult<Vec<Task>> {
        let inner = self.inner.lock().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| {
                filter
                    .task_type
                    .as_ref()
                    .is_none_or(|ty| &t.task_type == ty)
            })
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if let Some(limit) = filter.limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn cancel_task(&self, task_id: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        let Some(task) = inner.tasks.get_mut(task_id) else {
            return Err(CoreError::not_found("task", task_id.to_string()));
        };
        if task.status != TaskStatus::Pending {
            return Err(CoreError::InvalidInput(format!(
                "task {} is {} and cannot be cancelled",
                task_id,
                task.status.as_str()
            )));
        }
        task.status = TaskStatus::Cancelled;
        task.updated_at = Utc::now();
        let id = task.id.clone();
        inner.pending.retain(|pending| pending != &id);
        Ok(())
    }

    async fn purge(&self, older_than: DateTime<Utc>) -> CoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.tasks.len();
        inner
            .tasks
            .retain(|_, t| !(t.status.is_terminal() && t.updated_at < older_than));
        Ok((before - inner.tasks.len()) as u64)
    }

    async fn stats(&self) -> CoreResult<QueueStats> {
        let inner = self.inner.lock().await;
        let mut stats = QueueStats::default();
        for task in inner.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }

    async fn ping(&self) -> CoreResult<()> {
        let inner = self.inner.lock().await;
        if inner.closed {
            return Err(CoreError::Storage("queue is closed".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> CoreResult<()> {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
        Ok(())
    }
}
