//! OpenAI-compatible embedding adapter.
//!
//! Talks to any `/v1/embeddings`-shaped endpoint (OpenAI, Azure OpenAI,
//! local inference servers). Batches are split to the configured maximum
//! per request; results are re-ordered by index to match the input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::config::EmbeddingConfig;
use crate::domain::ports::EmbeddingService;

/// Configuration for the OpenAI-compatible embedding client.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// API key. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub max_batch_size: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_secs: 30,
            max_batch_size: 256,
        }
    }
}

impl From<&EmbeddingConfig> for OpenAiEmbeddingConfig {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout_secs: config.timeout_secs,
            max_batch_size: config.max_batch_size,
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn api_key(&self) -> CoreResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                CoreError::InvalidInput(
                    "embedding API key not set; configure api_key or OPENAI_API_KEY".to_string(),
                )
            })
    }
}

/// OpenAI-compatible embedding service.
pub struct OpenAiEmbeddingService {
    config: OpenAiEmbeddingConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingService {
    pub fn new(config: OpenAiEmbeddingConfig) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| CoreError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { config, client })
    }

    async fn call_embeddings_api(&self, texts: Vec<String>) -> CoreResult<Vec<Vec<f32>>> {
        let api_key = self.config.api_key()?;
        let url = format!("{}/embeddings", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&EmbeddingsRequest {
                model: self.config.model.clone(),
                input: texts,
            })
            .send()
            .await
            .map_err(|err| CoreError::Transport(format!("embedding request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Transport(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| CoreError::Serialization(format!("bad embedding response: {err}")))?;

        // The API may return out of order; indices restore input order.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingService {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.max_batch_size) {
            vectors.extend(self.call_embeddings_api(batch.to_vec()).await?);
        }
        if vectors.len() != texts.len() {
            return Err(CoreError::Transport(format!(
                "embedding API returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> CoreResult<Vec<f32>> {
        self.embed(std::slice::from_ref(&text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Transport("empty embedding response".to_string()))
    }

    async fn health_check(&self) -> CoreResult<()> {
        self.embed_query("ping").await.map(|_| ())
    }

    async fn close(&self) {
        // reqwest clients release their pool on drop.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: String) -> OpenAiEmbeddingService {
        OpenAiEmbeddingService::new(OpenAiEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            model: "test-model".to_string(),
            dimension: 3,
            timeout_secs: 5,
            max_batch_size: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_parses_and_orders_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"index":1,"embedding":[0.4,0.5,0.6]},
                    {"index":0,"embedding":[0.1,0.2,0.3]}
                ]}"#,
            )
            .create_async()
            .await;

        let service = service(server.url());
        let vectors = service
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn test_embed_splits_batches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"index":0,"embedding":[1.0]},{"index":1,"embedding":[2.0]}]}"#)
            .expect(2)
            .create_async()
            .await;

        let service = service(server.url());
        // Four inputs with max_batch_size 2 means two API calls.
        let texts: Vec<String> = (0..4).map(|i| format!("text {i}")).collect();
        let vectors = service.embed(&texts).await.unwrap();

        mock.assert_async().await;
        assert_eq!(vectors.len(), 4);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_as_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let service = service(server.url());
        let err = service.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, CoreError::Transport(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        // No server: an empty batch must not attempt a request.
        let service = service("http://127.0.0.1:1".to_string());
        assert!(service.embed(&[]).await.unwrap().is_empty());
    }
}
