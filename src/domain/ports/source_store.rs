//! Source store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::Source;

#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn create(&self, source: &Source) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<Source>>;

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<Source>>;

    async fn list(&self) -> CoreResult<Vec<Source>>;

    async fn update(&self, source: &Source) -> CoreResult<()>;

    /// Delete a source. Cascading cleanup of documents, chunks and sync
    /// state is the caller's responsibility.
    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// How many sources reference an installation. Guards installation
    /// deletion.
    async fn count_by_installation(&self, installation_id: &str) -> CoreResult<u64>;
}
