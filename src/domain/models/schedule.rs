//! Periodic task schedule domain model.
//!
//! A scheduled task is a template plus an interval. The schedule evaluator
//! enqueues a task whenever `next_run` falls due, then advances `next_run`
//! by the interval. Enqueue failures leave `next_run` untouched so the
//! schedule retries on the next tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::task::{Task, TaskType};
use crate::domain::ids;

/// A persistent periodic job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    /// Unique human-readable name.
    pub name: String,
    /// Type of task to enqueue when due.
    pub task_type: TaskType,
    pub team_id: Option<String>,
    /// Seconds between runs.
    pub interval_secs: u64,
    pub enabled: bool,
    /// Payload template copied onto each enqueued task.
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(name: impl Into<String>, task_type: TaskType, interval: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: ids::short_id(),
            name: name.into(),
            task_type,
            team_id: None,
            interval_secs: interval.as_secs(),
            enabled: true,
            payload: HashMap::new(),
            next_run: now,
            last_run: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn with_payload(mut self, payload: HashMap<String, serde_json::Value>) -> Self {
        self.payload = payload;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Due iff enabled and `next_run <= now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run <= now
    }

    /// Record a successful dispatch: advance `next_run`, clear the error.
    pub fn mark_dispatched(&mut self, now: DateTime<Utc>) {
        self.last_run = Some(now);
        self.next_run = now + chrono::Duration::seconds(self.interval_secs as i64);
        self.last_error = None;
        self.updated_at = now;
    }

    /// Record a dispatch failure without advancing `next_run`.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.last_error = Some(error.into());
        self.updated_at = now;
    }

    /// Materialise the task this schedule enqueues.
    pub fn build_task(&self) -> Task {
        let mut task = Task::new(self.task_type.clone()).with_payload(self.payload.clone());
        if let Some(team_id) = &self.team_id {
            task = task.with_team(team_id.clone());
        }
        task
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("schedule name cannot be empty".to_string());
        }
        if self.interval_secs == 0 {
            return Err("schedule interval must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_due_boundary() {
        let now = Utc::now();
        let mut sched = ScheduledTask::new("nightly", TaskType::SyncAll, Duration::from_secs(60));

        sched.next_run = now;
        assert!(sched.is_due(now), "next_run == now is due");

        sched.next_run = now + chrono::Duration::seconds(1);
        assert!(!sched.is_due(now));

        sched.next_run = now - chrono::Duration::seconds(1);
        sched.enabled = false;
        assert!(!sched.is_due(now), "disabled schedules are never due");
    }

    #[test]
    fn test_mark_dispatched_advances_next_run() {
        let now = Utc::now();
        let mut sched = ScheduledTask::new("sync", TaskType::SyncAll, Duration::from_secs(300));
        sched.last_error = Some("previous failure".to_string());

        sched.mark_dispatched(now);
        assert_eq!(sched.next_run, now + chrono::Duration::seconds(300));
        assert_eq!(sched.last_run, Some(now));
        assert!(sched.last_error.is_none());
    }

    #[test]
    fn test_mark_failed_keeps_next_run() {
        let now = Utc::now();
        let mut sched = ScheduledTask::new("sync", TaskType::SyncAll, Duration::from_secs(300));
        let due_at = sched.next_run;

        sched.mark_failed("queue unavailable", now);
        assert_eq!(sched.next_run, due_at);
        assert_eq!(sched.last_error.as_deref(), Some("queue unavailable"));
    }

    #[test]
    fn test_build_task_copies_template() {
        let mut payload = HashMap::new();
        payload.insert("source_id".to_string(), serde_json::json!("src-1"));
        let sched = ScheduledTask::new("one", TaskType::SyncSource, Duration::from_secs(60))
            .with_team("team-a")
            .with_payload(payload);

        let task = sched.build_task();
        assert_eq!(task.task_type, TaskType::SyncSource);
        assert_eq!(task.team_id.as_deref(), Some("team-a"));
        assert_eq!(task.payload_str("source_id"), Some("src-1"));
    }

    #[test]
    fn test_validate() {
        let sched = ScheduledTask::new("", TaskType::SyncAll, Duration::from_secs(60));
        assert!(sched.validate().is_err());

        let sched = ScheduledTask::new("ok", TaskType::SyncAll, Duration::from_secs(0));
        assert!(sched.validate().is_err());

        let sched = ScheduledTask::new("ok", TaskType::SyncAll, Duration::from_secs(30));
        assert!(sched.validate().is_ok());
    }
}
