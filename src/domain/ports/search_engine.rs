//! Search engine port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{Chunk, ScoredChunk, SearchOptions};

#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Index or reindex a batch of chunks by id.
    async fn index(&self, chunks: &[Chunk]) -> CoreResult<()>;

    /// Execute a query. `embedding` is present for semantic/hybrid modes.
    /// Returns ranked chunks and the total match count.
    async fn search(
        &self,
        query: &str,
        embedding: Option<&[f32]>,
        opts: &SearchOptions,
    ) -> CoreResult<(Vec<ScoredChunk>, usize)>;

    async fn delete(&self, ids: &[String]) -> CoreResult<()>;

    async fn delete_by_document(&self, document_id: &str) -> CoreResult<()>;

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<()>;

    async fn count(&self) -> CoreResult<u64>;

    async fn health_check(&self) -> CoreResult<()>;
}
