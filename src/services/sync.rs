//! Sync orchestrator: per-source incremental ingestion.
//!
//! Reconciles the local corpus with a remote source by applying its change
//! stream. Failure handling is layered: per-change errors are counted and
//! skipped, container-level transport errors abort that container only, and
//! source-level errors (missing, disabled, connector creation) fail the whole
//! run. Search-engine and embedding failures are warnings; text search still
//! works and the next re-sync repairs the index.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids;
use crate::domain::models::{Chunk, Source, SyncResult, SyncState, SyncStats, SyncStatus};
use crate::domain::ports::{
    Change, ChangeType, ChunkStore, Connector, ConnectorFactory, DocumentStore, SearchEngine,
    SourceStore, SyncStateStore,
};
use crate::services::pipeline::PostProcessor;
use crate::services::registry::CapabilityRegistry;

/// Result of syncing one container.
#[derive(Debug, Clone, Default)]
struct ContainerOutcome {
    stats: SyncStats,
    /// Last cursor observed, persisted for resumption.
    cursor: Option<String>,
    /// Container-level failure, when the container aborted.
    error: Option<String>,
}

/// Per-source incremental ingest pipeline.
pub struct SyncOrchestrator {
    sources: Arc<dyn SourceStore>,
    documents: Arc<dyn DocumentStore>,
    chunks: Arc<dyn ChunkStore>,
    sync_states: Arc<dyn SyncStateStore>,
    connector_factory: Arc<dyn ConnectorFactory>,
    pipeline: Arc<PostProcessor>,
    registry: Arc<CapabilityRegistry>,
    search: Arc<dyn SearchEngine>,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Arc<dyn SourceStore>,
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
        sync_states: Arc<dyn SyncStateStore>,
        connector_factory: Arc<dyn ConnectorFactory>,
        pipeline: Arc<PostProcessor>,
        registry: Arc<CapabilityRegistry>,
        search: Arc<dyn SearchEngine>,
    ) -> Self {
        Self {
            sources,
            documents,
            chunks,
            sync_states,
            connector_factory,
            pipeline,
            registry,
            search,
        }
    }

    /// Sync every enabled source, sequentially.
    ///
    /// Concurrency across sources is the worker pool's concern; running the
    /// sources one after another here keeps per-source state transitions
    /// simple.
    #[instrument(skip(self, cancel))]
    pub async fn sync_all(&self, cancel: &CancellationToken) -> CoreResult<Vec<SyncResult>> {
        let sources = self.sources.list().await?;
        let mut results = Vec::new();

        for source in sources {
            if cancel.is_cancelled() {
                break;
            }
            if !source.enabled {
                debug!(source = %source.name, "skipping disabled source");
                continue;
            }
            match self.sync_source(cancel, &source.id).await {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(source = %source.name, error = %err, "source sync errored");
                    results.push(SyncResult::failure(
                        source.id.clone(),
                        SyncStats::default(),
                        err.to_string(),
                    ));
                }
            }
        }
        Ok(results)
    }

    /// Sync one source: apply its change stream container by container.
    #[instrument(skip(self, cancel), err)]
    pub async fn sync_source(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> CoreResult<SyncResult> {
        let Some(source) = self.sources.get(source_id).await? else {
            return Err(CoreError::not_found("source", source_id.to_string()));
        };

        let mut state = self
            .sync_states
            .get(source_id)
            .await?
            .unwrap_or_else(|| SyncState::new(source_id));

        if !source.enabled {
            let message = format!("source {} is disabled", source.name);
            state.finish(
                SyncStatus::Failed,
                SyncStats::default(),
                None,
                Some(message.clone()),
                Utc::now(),
            );
            self.sync_states.upsert(&state).await?;
            return Ok(SyncResult::failure(source_id, SyncStats::default(), message));
        }

        state.begin(Utc::now());
        self.sync_states.upsert(&state).await?;

        let containers = source.containers();
        let mut stats = SyncStats::default();
        let mut cursor = state.cursor.clone();
        let mut failures: Vec<String> = Vec::new();
        let mut succeeded = 0usize;
        let mut cancelled = false;

        for container_id in &containers {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match self
                .sync_container(cancel, &source, container_id, state.cursor.clone())
                .await
            {
                Ok(outcome) => {
                    stats.merge(&outcome.stats);
                    if outcome.cursor.as_deref().is_some_and(|c| !c.is_empty()) {
                        cursor = outcome.cursor;
                    }
                    match outcome.error {
                        Some(error) => {
                            failures.push(format!("container {container_id:?}: {error}"));
                        }
                        None => succeeded += 1,
                    }
                }
                Err(CoreError::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        let (status, error, success) = if cancelled {
            let message = "sync cancelled".to_string();
            (SyncStatus::Failed, Some(message), false)
        } else {
            derive_outcome(containers.len(), succeeded, &failures)
        };

        state.finish(status, stats, cursor, error.clone(), Utc::now());
        self.sync_states.upsert(&state).await?;

        info!(
            source = %source.name,
            status = status.as_str(),
            added = stats.documents_added,
            updated = stats.documents_updated,
            deleted = stats.documents_deleted,
            chunks = stats.chunks_indexed,
            errors = stats.errors,
            "sync finished"
        );

        Ok(if success {
            let mut result = SyncResult::success(source_id, stats);
            result.error = error;
            result
        } else {
            SyncResult::failure(source_id, stats, error.unwrap_or_default())
        })
    }

    /// Remove a source and everything derived from it: chunks, documents,
    /// sync state and the search-engine entries.
    #[instrument(skip(self), err)]
    pub async fn purge_source(&self, source_id: &str) -> CoreResult<()> {
        let Some(source) = self.sources.get(source_id).await? else {
            return Err(CoreError::not_found("source", source_id.to_string()));
        };

        if let Err(err) = self.search.delete_by_source(source_id).await {
            warn!(source = %source.name, error = %err, "search cleanup failed");
        }
        let chunks = self.chunks.delete_by_source(source_id).await?;
        let documents = self.documents.delete_by_source(source_id).await?;
        self.sync_states.delete(source_id).await?;
        self.sources.delete(source_id).await?;

        info!(source = %source.name, documents, chunks, "source purged");
        Ok(())
    }

    /// Drive one container's paginated change stream.
    ///
    /// Only cancellation propagates as an error; every other failure is
    /// recorded on the returned outcome so sibling containers still run.
    async fn sync_container(
        &self,
        cancel: &CancellationToken,
        source: &Source,
        container_id: &str,
        start_cursor: Option<String>,
    ) -> CoreResult<ContainerOutcome> {
        let mut outcome = ContainerOutcome {
            cursor: start_cursor,
            ..ContainerOutcome::default()
        };

        let connector: Arc<dyn Connector> =
            match self.connector_factory.create(source, container_id).await {
                Ok(connector) => connector,
                Err(err) => {
                    outcome.error = Some(format!("failed to create connector: {err}"));
                    return Ok(outcome);
                }
            };

        if let Err(err) = connector.test_connection(source).await {
            outcome.error = Some(format!("connection test failed: {err}"));
            return Ok(outcome);
        }

        loop {
            // Page boundary: the only place cancellation is observed.
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let page = match connector
                .fetch_changes(source, outcome.cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(err) => {
                    outcome.error = Some(format!("failed to fetch changes: {err}"));
                    return Ok(outcome);
                }
            };

            if page.changes.is_empty() {
                break;
            }

            for change in &page.changes {
                if let Err(err) = self.apply_change(source, change, &mut outcome.stats).await {
                    outcome.stats.errors += 1;
                    warn!(
                        source = %source.name,
                        external_id = %change.external_id,
                        error = %err,
                        "change failed"
                    );
                }
            }

            // Termination: an empty cursor or a cursor that did not advance
            // ends the stream. The latter guards against providers that echo
            // the input cursor forever.
            match &page.next_cursor {
                None => break,
                Some(next) if next.is_empty() => break,
                Some(next) if Some(next.as_str()) == outcome.cursor.as_deref() => break,
                Some(next) => outcome.cursor = Some(next.clone()),
            }
        }

        Ok(outcome)
    }

    /// Apply one change. Store failures are fatal for this change only.
    async fn apply_change(
        &self,
        source: &Source,
        change: &Change,
        stats: &mut SyncStats,
    ) -> CoreResult<()> {
        match change.change_type {
            ChangeType::Deleted => self.apply_delete(source, change, stats).await,
            ChangeType::Added | ChangeType::Modified => {
                self.apply_upsert(source, change, stats).await
            }
        }
    }

    async fn apply_delete(
        &self,
        source: &Source,
        change: &Change,
        stats: &mut SyncStats,
    ) -> CoreResult<()> {
        let Some(document) = self
            .documents
            .get_by_external_id(&source.id, &change.external_id)
            .await?
        else {
            // Deleting something we never ingested is not an error.
            return Ok(());
        };

        if let Err(err) = self.search.delete_by_document(&document.id).await {
            warn!(document_id = %document.id, error = %err, "search delete failed");
        }
        self.chunks.delete_by_document(&document.id).await?;
        self.documents.delete(&document.id).await?;

        stats.documents_deleted += 1;
        debug!(document_id = %document.id, "document deleted");
        Ok(())
    }

    async fn apply_upsert(
        &self,
        source: &Source,
        change: &Change,
        stats: &mut SyncStats,
    ) -> CoreResult<()> {
        let Some(shell) = &change.document else {
            return Err(CoreError::InvalidInput(format!(
                "change {} has no document",
                change.external_id
            )));
        };

        let now = Utc::now();
        let existing = self
            .documents
            .get_by_external_id(&source.id, &change.external_id)
            .await?;
        let is_update = existing.is_some();

        let mut document = shell.clone();
        document.source_id = source.id.clone();
        document.external_id = change.external_id.clone();
        document.updated_at = now;
        document.indexed_at = Some(now);
        match existing {
            Some(previous) => {
                document.id = previous.id;
                document.created_at = previous.created_at;
            }
            None => {
                if document.id.is_empty() {
                    document.id = ids::short_id();
                }
                document.created_at = now;
            }
        }

        let mut content = change
            .content
            .clone()
            .unwrap_or_else(|| document.content.clone());
        if let Some(normalized) = self.pipeline.normalize(&document.mime_type, &content) {
            content = normalized;
        }
        document.content = content.clone();

        let spans = self.pipeline.chunk(&content);
        let embedder = self.registry.embedding().await;

        let mut chunks = Vec::with_capacity(spans.len());
        for span in spans {
            let mut chunk = Chunk::new(
                document.id.clone(),
                source.id.clone(),
                span.content,
                span.position,
            )
            .with_offsets(span.start_char, span.end_char);

            if let Some(embedder) = &embedder {
                match embedder.embed(std::slice::from_ref(&chunk.content)).await {
                    Ok(mut vectors) if !vectors.is_empty() => {
                        chunk.embedding = Some(vectors.remove(0));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // Text indexing still works without the vector.
                        warn!(chunk_id = %chunk.id, error = %err, "embedding failed");
                    }
                }
            }
            chunks.push(chunk);
        }

        if is_update {
            // An update may shrink the chunk count; stale ids must go.
            self.chunks.delete_by_document(&document.id).await?;
            if let Err(err) = self.search.delete_by_document(&document.id).await {
                warn!(document_id = %document.id, error = %err, "search cleanup failed");
            }
        }

        self.documents.upsert(&document).await?;
        self.chunks.upsert_batch(&chunks).await?;
        if let Err(err) = self.search.index(&chunks).await {
            warn!(document_id = %document.id, error = %err, "search indexing failed");
        }

        if is_update {
            stats.documents_updated += 1;
        } else {
            stats.documents_added += 1;
        }
        stats.chunks_indexed += chunks.len() as u64;
        debug!(document_id = %document.id, chunks = chunks.len(), "document indexed");
        Ok(())
    }
}

/// Derive the final status from per-container outcomes.
///
/// All containers failed means the run failed. A partial failure still
/// counts as success, with the failures recorded on the state.
fn derive_outcome(
    total: usize,
    succeeded: usize,
    failures: &[String],
) -> (SyncStatus, Option<String>, bool) {
    if failures.is_empty() {
        (SyncStatus::Completed, None, true)
    } else if succeeded == 0 && failures.len() == total {
        (
            SyncStatus::Failed,
            Some(format!("all containers failed: {}", failures.join("; "))),
            false,
        )
    } else {
        (
            SyncStatus::Completed,
            Some(format!("partial failure: {}", failures.join("; "))),
            true,
        )
    }
}
