//! Embedding service port for dense vector generation.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;

/// Converts text into dense vectors for semantic similarity search.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Provider name (e.g. "openai", "mock").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, preserving input order.
    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> CoreResult<Vec<f32>>;

    /// Cheap liveness probe, used by validate-then-swap.
    async fn health_check(&self) -> CoreResult<()>;

    /// Release resources held by the service.
    async fn close(&self);
}
