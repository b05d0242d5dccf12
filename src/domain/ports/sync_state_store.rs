//! Sync state store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::SyncState;

#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn get(&self, source_id: &str) -> CoreResult<Option<SyncState>>;

    /// Insert or replace the state row for its source.
    async fn upsert(&self, state: &SyncState) -> CoreResult<()>;

    async fn delete(&self, source_id: &str) -> CoreResult<()>;
}
