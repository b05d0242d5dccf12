//! Runtime capability registry.
//!
//! Process-wide holder of the optional AI services. Presence of an embedding
//! service flips the effective search mode from text-only to hybrid; swaps
//! close the previous instance and publish the new flags under the same lock
//! so readers never observe a flag out of sync with the actual service.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::errors::CoreResult;
use crate::domain::models::{CapabilityConfig, SearchMode};
use crate::domain::ports::{EmbeddingService, LlmService};

#[derive(Default)]
struct Inner {
    embedding: Option<Arc<dyn EmbeddingService>>,
    llm: Option<Arc<dyn LlmService>>,
}

/// Hot-swappable holder of AI services.
#[derive(Default)]
pub struct CapabilityRegistry {
    inner: RwLock<Inner>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current capability flags and effective search mode.
    pub async fn config(&self) -> CapabilityConfig {
        let inner = self.inner.read().await;
        let embedding_available = inner.embedding.is_some();
        CapabilityConfig {
            search_mode: if embedding_available {
                SearchMode::Hybrid
            } else {
                SearchMode::TextOnly
            },
            embedding_available,
            llm_available: inner.llm.is_some(),
        }
    }

    /// Snapshot of the embedding service, if registered.
    pub async fn embedding(&self) -> Option<Arc<dyn EmbeddingService>> {
        self.inner.read().await.embedding.clone()
    }

    /// Snapshot of the LLM service, if registered.
    pub async fn llm(&self) -> Option<Arc<dyn LlmService>> {
        self.inner.read().await.llm.clone()
    }

    /// Replace the embedding service, closing the previous instance.
    pub async fn set_embedding(&self, service: Option<Arc<dyn EmbeddingService>>) {
        let mut inner = self.inner.write().await;
        let previous = std::mem::replace(&mut inner.embedding, service);
        if let Some(previous) = previous {
            previous.close().await;
        }
        info!(
            available = inner.embedding.is_some(),
            "embedding service swapped"
        );
    }

    /// Replace the LLM service, closing the previous instance.
    pub async fn set_llm(&self, service: Option<Arc<dyn LlmService>>) {
        let mut inner = self.inner.write().await;
        let previous = std::mem::replace(&mut inner.llm, service);
        if let Some(previous) = previous {
            previous.close().await;
        }
        info!(available = inner.llm.is_some(), "llm service swapped");
    }

    /// Health-check a candidate embedding service, then swap it in.
    ///
    /// On a failed check the candidate is closed and the error returned
    /// without touching the current registration.
    pub async fn validate_and_set_embedding(
        &self,
        service: Arc<dyn EmbeddingService>,
    ) -> CoreResult<()> {
        if let Err(err) = service.health_check().await {
            warn!(provider = service.name(), error = %err, "embedding validation failed");
            service.close().await;
            return Err(err);
        }
        self.set_embedding(Some(service)).await;
        Ok(())
    }

    /// Ping a candidate LLM service, then swap it in.
    pub async fn validate_and_set_llm(&self, service: Arc<dyn LlmService>) -> CoreResult<()> {
        if let Err(err) = service.ping().await {
            warn!(provider = service.name(), error = %err, "llm validation failed");
            service.close().await;
            return Err(err);
        }
        self.set_llm(Some(service)).await;
        Ok(())
    }

    /// Shut down both services and clear the flags.
    pub async fn close(&self) {
        let mut inner = self.inner.write().await;
        if let Some(embedding) = inner.embedding.take() {
            embedding.close().await;
        }
        if let Some(llm) = inner.llm.take() {
            llm.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeEmbedding {
        healthy: bool,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl EmbeddingService for FakeEmbedding {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        async fn embed_query(&self, _text: &str) -> CoreResult<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        async fn health_check(&self) -> CoreResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(CoreError::Transport("unhealthy".to_string()))
            }
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct FakeLlm {
        pings: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmService for FakeLlm {
        fn name(&self) -> &'static str {
            "fake-llm"
        }

        async fn ping(&self) -> CoreResult<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn test_empty_registry_is_text_only() {
        let registry = CapabilityRegistry::new();
        let config = registry.config().await;
        assert_eq!(config.search_mode, SearchMode::TextOnly);
        assert!(!config.embedding_available);
        assert!(!config.llm_available);
        assert!(registry.embedding().await.is_none());
    }

    #[tokio::test]
    async fn test_registering_embedding_enables_hybrid() {
        let registry = CapabilityRegistry::new();
        registry
            .validate_and_set_embedding(Arc::new(FakeEmbedding {
                healthy: true,
                closed: Arc::new(AtomicBool::new(false)),
            }))
            .await
            .unwrap();

        let config = registry.config().await;
        assert_eq!(config.search_mode, SearchMode::Hybrid);
        assert!(config.embedding_available);
    }

    #[tokio::test]
    async fn test_failed_validation_closes_candidate_and_keeps_current() {
        let registry = CapabilityRegistry::new();
        let current_closed = Arc::new(AtomicBool::new(false));
        registry
            .set_embedding(Some(Arc::new(FakeEmbedding {
                healthy: true,
                closed: current_closed.clone(),
            })))
            .await;

        let candidate_closed = Arc::new(AtomicBool::new(false));
        let result = registry
            .validate_and_set_embedding(Arc::new(FakeEmbedding {
                healthy: false,
                closed: candidate_closed.clone(),
            }))
            .await;

        assert!(result.is_err());
        assert!(candidate_closed.load(Ordering::SeqCst));
        assert!(!current_closed.load(Ordering::SeqCst));
        assert!(registry.config().await.embedding_available);
    }

    #[tokio::test]
    async fn test_swap_closes_previous_instance() {
        let registry = CapabilityRegistry::new();
        let first_closed = Arc::new(AtomicBool::new(false));
        registry
            .set_embedding(Some(Arc::new(FakeEmbedding {
                healthy: true,
                closed: first_closed.clone(),
            })))
            .await;

        registry
            .set_embedding(Some(Arc::new(FakeEmbedding {
                healthy: true,
                closed: Arc::new(AtomicBool::new(false)),
            })))
            .await;

        assert!(first_closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_llm_validation_pings() {
        let registry = CapabilityRegistry::new();
        let pings = Arc::new(AtomicUsize::new(0));
        registry
            .validate_and_set_llm(Arc::new(FakeLlm { pings: pings.clone() }))
            .await
            .unwrap();
        assert_eq!(pings.load(Ordering::SeqCst), 1);
        assert!(registry.config().await.llm_available);
    }

    #[tokio::test]
    async fn test_close_clears_everything() {
        let registry = CapabilityRegistry::new();
        let closed = Arc::new(AtomicBool::new(false));
        registry
            .set_embedding(Some(Arc::new(FakeEmbedding {
                healthy: true,
                closed: closed.clone(),
            })))
            .await;

        registry.close().await;
        assert!(closed.load(Ordering::SeqCst));
        assert!(!registry.config().await.embedding_available);
    }
}
