//! Domain models.

pub mod auth;
pub mod config;
pub mod document;
pub mod installation;
pub mod oauth;
pub mod provider;
pub mod schedule;
pub mod search;
pub mod source;
pub mod sync;
pub mod task;

pub use auth::{AuthTokens, AuthenticatedUser, Session, TokenClaims, User, UserRole, UserSummary};
pub use config::Config;
pub use document::{Chunk, Document};
pub use installation::Installation;
pub use oauth::{
    AuthorizeResponse, CallbackParams, CallbackResponse, InstallationSummary, OAuthState,
    OAuthUserInfo, ProviderConfig, TokenGrant,
};
pub use provider::ProviderType;
pub use schedule::ScheduledTask;
pub use search::{
    CapabilityConfig, ScoredChunk, SearchMode, SearchOptions, SearchRequest, SearchResponse,
    SearchResult,
};
pub use source::Source;
pub use sync::{SyncResult, SyncState, SyncStats, SyncStatus};
pub use task::{QueueStats, Task, TaskFilter, TaskStatus, TaskType};
