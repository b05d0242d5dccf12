//! Scheduled task store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CoreResult;
use crate::domain::models::ScheduledTask;

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn create(&self, schedule: &ScheduledTask) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledTask>>;

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<ScheduledTask>>;

    async fn list(&self) -> CoreResult<Vec<ScheduledTask>>;

    /// All enabled schedules with `next_run <= now`.
    async fn get_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<ScheduledTask>>;

    async fn update(&self, schedule: &ScheduledTask) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}
