//! Sercha - multi-source knowledge ingestion and hybrid search.
//!
//! The core pipeline: connectors pull paginated change streams per source,
//! the post-processor chunks and normalises content, embeddings are computed
//! when an embedding service is registered, and documents/chunks are upserted
//! into the stores and the search engine. A durable task queue, worker pool
//! and schedule evaluator drive periodic syncs; an OAuth2/PKCE flow produces
//! provider installations; an opaque-session token service guards the ingress.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;
