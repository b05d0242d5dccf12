//! Search request/response models and capability flags.

use serde::{Deserialize, Serialize};

use super::document::{Chunk, Document};

/// How a query is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Lexical scoring only.
    TextOnly,
    /// Vector similarity only.
    SemanticOnly,
    /// Lexical and vector scores fused.
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextOnly => "text_only",
            Self::SemanticOnly => "semantic_only",
            Self::Hybrid => "hybrid",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text_only" | "text" => Some(Self::TextOnly),
            "semantic_only" | "semantic" => Some(Self::SemanticOnly),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Whether this mode needs a query embedding.
    pub fn needs_embedding(&self) -> bool {
        matches!(self, Self::SemanticOnly | Self::Hybrid)
    }
}

/// Bounds applied to every search.
pub const MIN_SEARCH_LIMIT: usize = 1;
pub const MAX_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// An incoming search request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Defaults to the registry's effective mode when absent.
    pub mode: Option<SearchMode>,
    pub limit: Option<usize>,
    /// Restrict to these sources; empty means all.
    #[serde(default)]
    pub source_ids: Vec<String>,
}

/// Options handed to the search engine.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub limit: usize,
    pub source_ids: Vec<String>,
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::TextOnly
    }
}

/// A chunk with its engine-assigned relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One ranked result, enriched with its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
    pub document: Option<Document>,
}

/// The response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    /// The mode actually executed after degradation rules.
    pub effective_mode: SearchMode,
    pub results: Vec<SearchResult>,
    pub total_count: usize,
    pub elapsed_ms: u64,
}

/// Snapshot of the capability registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Mode searches default to, derived from service presence.
    pub search_mode: SearchMode,
    pub embedding_available: bool,
    pub llm_available: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::TextOnly,
            embedding_available: false,
            llm_available: false,
        }
    }
}
