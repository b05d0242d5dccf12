//! Built-in task handlers for the worker pool.
//!
//! Both handlers are idempotent: sync writes are keyed on stable
//! identifiers, so a duplicate delivery converges to the same state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{Task, TaskType};
use crate::services::sync::SyncOrchestrator;
use crate::services::worker_pool::TaskHandler;

/// Handles `sync_source` tasks. Requires `payload["source_id"]`.
pub struct SyncSourceHandler {
    orchestrator: Arc<SyncOrchestrator>,
}

impl SyncSourceHandler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl TaskHandler for SyncSourceHandler {
    fn task_type(&self) -> TaskType {
        TaskType::SyncSource
    }

    async fn handle(&self, cancel: &CancellationToken, task: &Task) -> CoreResult<()> {
        let Some(source_id) = task.payload_str("source_id") else {
            return Err(CoreError::InvalidInput("missing source_id".to_string()));
        };

        let result = self.orchestrator.sync_source(cancel, source_id).await?;
        if result.success {
            Ok(())
        } else {
            Err(CoreError::Transport(
                result.error.unwrap_or_else(|| "sync failed".to_string()),
            ))
        }
    }
}

/// Handles `sync_all` tasks.
pub struct SyncAllHandler {
    orchestrator: Arc<SyncOrchestrator>,
}

impl SyncAllHandler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl TaskHandler for SyncAllHandler {
    fn task_type(&self) -> TaskType {
        TaskType::SyncAll
    }

    async fn handle(&self, cancel: &CancellationToken, _task: &Task) -> CoreResult<()> {
        let results = self.orchestrator.sync_all(cancel).await?;
        let failed: Vec<&str> = results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.source_id.as_str())
            .collect();

        info!(
            sources = results.len(),
            failed = failed.len(),
            "sync_all finished"
        );
        if failed.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Transport(format!(
                "sync failed for sources: {}",
                failed.join(", ")
            )))
        }
    }
}
