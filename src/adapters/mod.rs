//! Substrate adapters implementing the domain ports.

pub mod auth;
pub mod connectors;
pub mod embeddings;
pub mod llm;
pub mod memory;
pub mod oauth;
pub mod sqlite;
