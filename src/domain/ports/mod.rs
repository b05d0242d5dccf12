//! Ports consumed by the core services.
//!
//! Each port is an abstract contract; any adapter may satisfy it. The
//! adapters shipped in-tree are the sqlite stores, the in-memory stores, the
//! OpenAI-compatible AI clients and the generic OAuth2 handler.

pub mod auth;
pub mod chunk_store;
pub mod connector;
pub mod document_store;
pub mod embedding;
pub mod installation_store;
pub mod llm;
pub mod normalizer;
pub mod oauth_handler;
pub mod oauth_state_store;
pub mod provider_config_store;
pub mod schedule_store;
pub mod search_engine;
pub mod session_store;
pub mod source_store;
pub mod sync_state_store;
pub mod task_queue;
pub mod user_store;

pub use auth::AuthAdapter;
pub use chunk_store::ChunkStore;
pub use connector::{Change, ChangePage, ChangeType, Connector, ConnectorFactory};
pub use document_store::DocumentStore;
pub use embedding::EmbeddingService;
pub use installation_store::InstallationStore;
pub use llm::LlmService;
pub use normalizer::Normalizer;
pub use oauth_handler::OAuthHandler;
pub use oauth_state_store::OAuthStateStore;
pub use provider_config_store::ProviderConfigStore;
pub use schedule_store::ScheduleStore;
pub use search_engine::SearchEngine;
pub use session_store::SessionStore;
pub use source_store::SourceStore;
pub use sync_state_store::SyncStateStore;
pub use task_queue::TaskQueue;
pub use user_store::UserStore;
