//! In-memory adapters.
//!
//! Complete, mutex-serialised implementations of every store port plus the
//! task queue and a small search engine. They back the test suite and the
//! dev wiring; production deployments use the sqlite adapters for the
//! durable stores. The OAuth state store is memory-native by design: states
//! live ten minutes and must be consumed atomically.

mod queue;
mod search;
mod stores;

pub use queue::MemoryTaskQueue;
pub use search::MemorySearchEngine;
pub use stores::{
    MemoryChunkStore, MemoryDocumentStore, MemoryInstallationStore, MemoryOAuthStateStore,
    MemoryProviderConfigStore, MemoryScheduleStore, MemorySessionStore, MemorySourceStore,
    MemorySyncStateStore, MemoryUserStore,
};
