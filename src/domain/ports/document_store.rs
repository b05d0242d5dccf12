//! Document store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::Document;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace by id.
    async fn upsert(&self, document: &Document) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<Document>>;

    /// Lookup by the natural key `(source_id, external_id)`.
    async fn get_by_external_id(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> CoreResult<Option<Document>>;

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<Document>>;

    async fn delete(&self, id: &str) -> CoreResult<()>;

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64>;

    async fn count(&self) -> CoreResult<u64>;
}
