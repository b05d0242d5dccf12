//! Embedding service adapters.

mod openai;

pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingService};
