//! Application services: the core subsystems wired over the domain ports.

pub mod handlers;
pub mod oauth_service;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod search_service;
pub mod session_service;
pub mod sync;
pub mod worker_pool;

pub use oauth_service::OAuthService;
pub use pipeline::PostProcessor;
pub use registry::CapabilityRegistry;
pub use scheduler::Scheduler;
pub use search_service::SearchService;
pub use session_service::SessionService;
pub use sync::SyncOrchestrator;
pub use worker_pool::WorkerPool;
