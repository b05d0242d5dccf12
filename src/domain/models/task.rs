//! Task domain model.
//!
//! Tasks are units of deferred work carried by the durable queue. Delivery is
//! at-least-once, so every handler must tolerate duplicates; sync handlers
//! get that for free from idempotent upserts and deterministic chunk ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// What kind of work a task represents.
///
/// Serialised as its wire string, so new handler types round-trip through
/// the queue without a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Sync every enabled source.
    SyncAll,
    /// Sync one source; payload carries `source_id`.
    SyncSource,
    /// Forward-compatible escape hatch for handler types registered at runtime.
    Other(String),
}

impl Serialize for TaskType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_str(&raw))
    }
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SyncAll => "sync_all",
            Self::SyncSource => "sync_source",
            Self::Other(name) => name,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "sync_all" => Self::SyncAll,
            "sync_source" => Self::SyncSource,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue-visible status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Acked by its handler.
    Completed,
    /// Nacked; the reason is recorded and the task requeued or parked.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: TaskType,
    pub team_id: Option<String>,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
    pub status: TaskStatus,
    /// Delivery attempts so far (incremented on each dequeue).
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_type: TaskType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            task_type,
            team_id: None,
            payload: HashMap::new(),
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a `sync_source` task for one source.
    pub fn sync_source(source_id: impl Into<String>) -> Self {
        Self::new(TaskType::SyncSource)
            .with_payload_value("source_id", serde_json::json!(source_id.into()))
    }

    /// Build a `sync_all` task.
    pub fn sync_all() -> Self {
        Self::new(TaskType::SyncAll)
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_payload_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn with_payload(mut self, payload: HashMap<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Read a required string payload field.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

/// Filter for queue listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
    pub limit: Option<usize>,
}

/// Aggregate queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_round_trip() {
        assert_eq!(TaskType::from_str("sync_all"), TaskType::SyncAll);
        assert_eq!(TaskType::from_str("sync_source"), TaskType::SyncSource);
        assert_eq!(
            TaskType::from_str("reindex"),
            TaskType::Other("reindex".to_string())
        );
        assert_eq!(TaskType::from_str("reindex").as_str(), "reindex");
    }

    #[test]
    fn test_task_type_serde_round_trip() {
        assert_eq!(
            serde_json::to_string(&TaskType::SyncAll).unwrap(),
            "\"sync_all\""
        );
        let parsed: TaskType = serde_json::from_str("\"reindex\"").unwrap();
        assert_eq!(parsed, TaskType::Other("reindex".to_string()));
    }

    #[test]
    fn test_sync_source_constructor_sets_payload() {
        let task = Task::sync_source("src-9");
        assert_eq!(task.task_type, TaskType::SyncSource);
        assert_eq!(task.payload_str("source_id"), Some("src-9"));
    }

    #[test]
    fn test_status_terminality() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }
}
