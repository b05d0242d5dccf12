//! Application configuration tree.
//!
//! Loaded hierarchically by `infrastructure::config::ConfigLoader`:
//! defaults, then `sercha.yaml`, then `sercha.local.yaml`, then `SERCHA_*`
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::oauth::ProviderConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub workers: WorkerConfig,
    pub scheduler: SchedulerConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    /// OAuth client credentials keyed by provider name (e.g. "github").
    pub oauth: HashMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "sercha.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// One of: json, pretty.
    pub format: String,
    /// Optional log file directory; stderr when unset.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub concurrency: usize,
    /// Blocking dequeue timeout in seconds.
    pub dequeue_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            dequeue_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between evaluator ticks.
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens.
    pub token_secret: String,
    /// Token lifetime in hours.
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters of overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// Snap chunk ends to sentence boundaries when possible.
    pub respect_boundaries: bool,
    /// Drop duplicate chunk contents within one document.
    pub dedup: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1600,
            chunk_overlap: 200,
            respect_boundaries: true,
            dedup: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    /// OpenAI-compatible endpoint base.
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            api_key: None,
            timeout_secs: 30,
            max_batch_size: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.scheduler.poll_interval_secs, 30);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert!(config.pipeline.validate().is_ok());
    }

    #[test]
    fn test_pipeline_validation() {
        let mut pipeline = PipelineConfig::default();
        pipeline.chunk_overlap = pipeline.chunk_size;
        assert!(pipeline.validate().is_err());
    }
}
