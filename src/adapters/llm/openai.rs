//! OpenAI-compatible LLM adapter.
//!
//! The core only uses the LLM for capability validation, so this client
//! exposes just a ping against the models endpoint.

use async_trait::async_trait;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::config::LlmConfig;
use crate::domain::ports::LlmService;

#[derive(Debug, Clone)]
pub struct OpenAiLlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiLlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl From<&LlmConfig> for OpenAiLlmConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// OpenAI-compatible chat service, surfaced here only for its liveness probe.
pub struct OpenAiLlmService {
    config: OpenAiLlmConfig,
    client: reqwest::Client,
}

impl OpenAiLlmService {
    pub fn new(config: OpenAiLlmConfig) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| CoreError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> CoreResult<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                CoreError::InvalidInput(
                    "llm API key not set; configure api_key or OPENAI_API_KEY".to_string(),
                )
            })
    }
}

#[async_trait]
impl LlmService for OpenAiLlmService {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn ping(&self) -> CoreResult<()> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}", self.config.base_url, self.config.model);

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|err| CoreError::Transport(format!("llm ping failed: {err}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CoreError::Transport(format!(
                "llm ping returned {}",
                response.status()
            )))
        }
    }

    async fn close(&self) {
        // reqwest clients release their pool on drop.
    }
}
