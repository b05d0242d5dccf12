//! Chunk store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::Chunk;

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or replace a batch by chunk id.
    async fn upsert_batch(&self, chunks: &[Chunk]) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<Chunk>>;

    async fn list_by_document(&self, document_id: &str) -> CoreResult<Vec<Chunk>>;

    async fn delete_by_document(&self, document_id: &str) -> CoreResult<u64>;

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64>;

    async fn count(&self) -> CoreResult<u64>;
}
