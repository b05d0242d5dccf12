//! Search service: query planning against the search engine.
//!
//! Plans each request from the capability registry's snapshot: an absent
//! mode falls back to the effective mode, and any mode that needs an
//! embedding degrades to text-only when no embedding service is registered
//! or the query embedding fails. Ranked chunks are enriched with their
//! documents before returning.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::search::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, MIN_SEARCH_LIMIT};
use crate::domain::models::{
    SearchMode, SearchOptions, SearchRequest, SearchResponse, SearchResult,
};
use crate::domain::ports::{DocumentStore, SearchEngine};
use crate::services::registry::CapabilityRegistry;

/// Hybrid/text/semantic query planner.
pub struct SearchService {
    engine: Arc<dyn SearchEngine>,
    registry: Arc<CapabilityRegistry>,
    documents: Arc<dyn DocumentStore>,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        registry: Arc<CapabilityRegistry>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            engine,
            registry,
            documents,
        }
    }

    #[instrument(skip(self, request), fields(query = %request.query), err)]
    pub async fn search(&self, request: &SearchRequest) -> CoreResult<SearchResponse> {
        if request.query.trim().is_empty() {
            return Err(CoreError::InvalidInput("query is required".to_string()));
        }

        let started = Instant::now();
        let capabilities = self.registry.config().await;

        let mut mode = request.mode.unwrap_or(capabilities.search_mode);
        let limit = request
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(MIN_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

        let mut embedding = None;
        if mode.needs_embedding() {
            match self.registry.embedding().await {
                None => {
                    debug!("no embedding service registered, degrading to text search");
                    mode = SearchMode::TextOnly;
                }
                Some(embedder) => match embedder.embed_query(&request.query).await {
                    Ok(vector) => embedding = Some(vector),
                    Err(err) => {
                        warn!(error = %err, "query embedding failed, degrading to text search");
                        mode = SearchMode::TextOnly;
                    }
                },
            }
        }

        let opts = SearchOptions {
            mode,
            limit,
            source_ids: request.source_ids.clone(),
        };
        let (ranked, total_count) = self
            .engine
            .search(&request.query, embedding.as_deref(), &opts)
            .await?;

        let mut results = Vec::with_capacity(ranked.len());
        for scored in ranked {
            let document = self.documents.get(&scored.chunk.document_id).await?;
            results.push(SearchResult {
                chunk: scored.chunk,
                score: scored.score,
                document,
            });
        }

        Ok(SearchResponse {
            query: request.query.clone(),
            effective_mode: mode,
            results,
            total_count,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Chunk, Document, ScoredChunk};
    use crate::domain::ports::EmbeddingService;
    use async_trait::async_trait;
    use mockall::mock;
    use std::sync::Mutex;

    mock! {
        pub Documents {}

        #[async_trait]
        impl DocumentStore for Documents {
            async fn upsert(&self, document: &Document) -> CoreResult<()>;
            async fn get(&self, id: &str) -> CoreResult<Option<Document>>;
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
    }

    /// Records the query plan the service hands the engine.
    #[derive(Default)]
    struct RecordingEngine {
        results: Vec<ScoredChunk>,
        last_call: Mutex<Option<(Option<Vec<f32>>, SearchOptions)>>,
    }

    impl RecordingEngine {
        fn with_results(results: Vec<ScoredChunk>) -> Self {
            Self {
                results,
                last_call: Mutex::new(None),
            }
        }

        fn last_call(&self) -> (Option<Vec<f32>>, SearchOptions) {
            self.last_call
                .lock()
                .unwrap()
                .clone()
                .expect("engine was queried")
        }
    }

    #[async_trait]
    impl SearchEngine for RecordingEngine {
        async fn index(&self, _chunks: &[Chunk]) -> CoreResult<()> {
            Ok(())
        }

        async fn search(
            &self,
            _query: &str,
            embedding: Option<&[f32]>,
            opts: &SearchOptions,
        ) -> CoreResult<(Vec<ScoredChunk>, usize)> {
            *self.last_call.lock().unwrap() =
                Some((embedding.map(<[f32]>::to_vec), opts.clone()));
            Ok((self.results.clone(), self.results.len()))
        }

        async fn delete(&self, _ids: &[String]) -> CoreResult<()> {
            Ok(())
        }

        async fn delete_by_document(&self, _document_id: &str) -> CoreResult<()> {
            Ok(())
        }

        async fn delete_by_source(&self, _source_id: &str) -> CoreResult<()> {
            Ok(())
        }

        async fn count(&self) -> CoreResult<u64> {
            Ok(self.results.len() as u64)
        }

        async fn health_check(&self) -> CoreResult<()> {
            Ok(())
        }
    }

    struct BrokenEmbedding;

    #[async_trait]
    impl EmbeddingService for BrokenEmbedding {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn dimensions(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Err(CoreError::Transport("embedding down".to_string()))
        }
        async fn embed_query(&self, _text: &str) -> CoreResult<Vec<f32>> {
            Err(CoreError::Transport("embedding down".to_string()))
        }
        async fn health_check(&self) -> CoreResult<()> {
            Ok(())
        }
        async fn close(&self) {}
    }

    struct GoodEmbedding;

    #[async_trait]
    impl EmbeddingService for GoodEmbedding {
        fn name(&self) -> &'static str {
            "good"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
        }
        async fn embed_query(&self, _text: &str) -> CoreResult<Vec<f32>> {
            Ok(vec![0.5, 0.5])
        }
        async fn health_check(&self) -> CoreResult<()> {
            Ok(())
        }
        async fn close(&self) {}
    }

    fn chunk_result() -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new("doc-1", "src-1", "hello world", 0),
            score: 1.5,
        }
    }

    fn request(query: &str, mode: Option<SearchMode>, limit: Option<usize>) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            mode,
            limit,
            source_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let service = SearchService::new(
            Arc::new(RecordingEngine::default()),
            Arc::new(CapabilityRegistry::new()),
            Arc::new(MockDocuments::new()),
        );
        let err = service
            .search(&SearchRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_defaults_to_registry_mode_and_bounds_limit() {
        let engine = Arc::new(RecordingEngine::default());
        let service = SearchService::new(
            engine.clone(),
            Arc::new(CapabilityRegistry::new()),
            Arc::new(MockDocuments::new()),
        );

        let response = service
            .search(&request("rust", None, Some(5000)))
            .await
            .unwrap();
        assert_eq!(response.effective_mode, SearchMode::TextOnly);

        let (embedding, opts) = engine.last_call();
        assert!(embedding.is_none());
        assert_eq!(opts.mode, SearchMode::TextOnly);
        assert_eq!(opts.limit, 100);
    }

    #[tokio::test]
    async fn test_zero_limit_is_raised_to_minimum() {
        let engine = Arc::new(RecordingEngine::default());
        let service = SearchService::new(
            engine.clone(),
            Arc::new(CapabilityRegistry::new()),
            Arc::new(MockDocuments::new()),
        );

        service.search(&request("rust", None, Some(0))).await.unwrap();
        assert_eq!(engine.last_call().1.limit, 1);
    }

    #[tokio::test]
    async fn test_hybrid_degrades_without_embedding_service() {
        let engine = Arc::new(RecordingEngine::default());
        let service = SearchService::new(
            engine.clone(),
            Arc::new(CapabilityRegistry::new()),
            Arc::new(MockDocuments::new()),
        );

        let response = service
            .search(&request("rust", Some(SearchMode::Hybrid), None))
            .await
            .unwrap();
        assert_eq!(response.effective_mode, SearchMode::TextOnly);
        assert!(engine.last_call().0.is_none());
    }

    #[tokio::test]
    async fn test_embedding_error_degrades_to_text() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.set_embedding(Some(Arc::new(BrokenEmbedding))).await;

        let engine = Arc::new(RecordingEngine::default());
        let service =
            SearchService::new(engine.clone(), registry, Arc::new(MockDocuments::new()));

        let response = service
            .search(&request("rust", Some(SearchMode::SemanticOnly), None))
            .await
            .unwrap();
        assert_eq!(response.effective_mode, SearchMode::TextOnly);
        assert!(engine.last_call().0.is_none());
    }

    #[tokio::test]
    async fn test_hybrid_runs_with_query_embedding() {
        let registry = Arc::new(CapabilityRegistry::new());
        registry.set_embedding(Some(Arc::new(GoodEmbedding))).await;

        let engine = Arc::new(RecordingEngine::default());
        let service =
            SearchService::new(engine.clone(), registry, Arc::new(MockDocuments::new()));

        // No explicit mode: with an embedding service the registry defaults
        // to hybrid.
        let response = service.search(&request("rust", None, None)).await.unwrap();
        assert_eq!(response.effective_mode, SearchMode::Hybrid);

        let (embedding, opts) = engine.last_call();
        assert_eq!(embedding, Some(vec![0.5, 0.5]));
        assert_eq!(opts.mode, SearchMode::Hybrid);
    }

    #[tokio::test]
    async fn test_results_are_enriched_with_documents() {
        let engine = Arc::new(RecordingEngine::with_results(vec![chunk_result()]));

        let mut documents = MockDocuments::new();
        documents.expect_get().returning(|id| {
            let mut doc = Document::new("ext-1", "Title");
            doc.id = id.to_string();
            Ok(Some(doc))
        });

        let service = SearchService::new(
            engine,
            Arc::new(CapabilityRegistry::new()),
            Arc::new(documents),
        );

        let response = service.search(&request("hello", None, None)).await.unwrap();

        assert_eq!(response.total_count, 1);
        assert_eq!(response.results.len(), 1);
        let document = response.results[0].document.as_ref().unwrap();
        assert_eq!(document.id, "doc-1");
    }
}
