//! LLM service adapters.

mod openai;

pub use openai::{OpenAiLlmConfig, OpenAiLlmService};
