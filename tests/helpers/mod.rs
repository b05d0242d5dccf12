//! Shared fixtures for the integration suite.
//!
//! Wires the orchestrator over the in-memory adapters with a scripted
//! connector that tests can swap between runs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;

use sercha::adapters::connectors::ScriptedConnector;
use sercha::adapters::memory::{
    MemoryChunkStore, MemoryDocumentStore, MemorySearchEngine, MemorySourceStore,
    MemorySyncStateStore,
};
use sercha::domain::errors::{CoreError, CoreResult};
use sercha::domain::models::config::PipelineConfig;
use sercha::domain::models::{Document, ProviderType, Source};
use sercha::domain::ports::{Change, ChangePage, Connector, ConnectorFactory};
use sercha::services::{CapabilityRegistry, PostProcessor, SyncOrchestrator};

/// Factory that serves one swappable connector for every container.
pub struct SwapFactory {
    connector: RwLock<Arc<ScriptedConnector>>,
}

impl SwapFactory {
    pub fn new(connector: Arc<ScriptedConnector>) -> Self {
        Self {
            connector: RwLock::new(connector),
        }
    }

    pub fn swap(&self, connector: Arc<ScriptedConnector>) {
        *self.connector.write().expect("factory lock poisoned") = connector;
    }
}

#[async_trait]
impl ConnectorFactory for SwapFactory {
    async fn create(&self, _source: &Source, _container_id: &str) -> CoreResult<Arc<dyn Connector>> {
        Ok(self.connector.read().expect("factory lock poisoned").clone())
    }
}

/// Factory with a distinct connector per container id.
pub struct MapFactory {
    connectors: HashMap<String, Arc<ScriptedConnector>>,
}

impl MapFactory {
    pub fn new(connectors: HashMap<String, Arc<ScriptedConnector>>) -> Self {
        Self { connectors }
    }
}

#[async_trait]
impl ConnectorFactory for MapFactory {
    async fn create(&self, _source: &Source, container_id: &str) -> CoreResult<Arc<dyn Connector>> {
        self.connectors
            .get(container_id)
            .cloned()
            .map(|c| c as Arc<dyn Connector>)
            .ok_or_else(|| CoreError::not_found("connector", container_id.to_string()))
    }
}

/// Orchestrator over memory adapters with a swappable connector.
pub struct Harness {
    pub sources: Arc<MemorySourceStore>,
    pub documents: Arc<MemoryDocumentStore>,
    pub chunks: Arc<MemoryChunkStore>,
    pub sync_states: Arc<MemorySyncStateStore>,
    pub search: Arc<MemorySearchEngine>,
    pub registry: Arc<CapabilityRegistry>,
    pub factory: Arc<SwapFactory>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_factory_inner(None)
    }

    pub fn with_factory(factory: Arc<dyn ConnectorFactory>) -> Self {
        Self::with_factory_inner(Some(factory))
    }

    fn with_factory_inner(custom: Option<Arc<dyn ConnectorFactory>>) -> Self {
        let sources = Arc::new(MemorySourceStore::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let chunks = Arc::new(MemoryChunkStore::new());
        let sync_states = Arc::new(MemorySyncStateStore::new());
        let search = Arc::new(MemorySearchEngine::new());
        let registry = Arc::new(CapabilityRegistry::new());
        let factory = Arc::new(SwapFactory::new(Arc::new(ScriptedConnector::default())));

        let pipeline = PostProcessor::new(PipelineConfig {
            chunk_size: 64,
            chunk_overlap: 8,
            respect_boundaries: true,
            dedup: true,
        })
        .expect("valid pipeline config");

        let connector_factory: Arc<dyn ConnectorFactory> = match custom {
            Some(custom) => custom,
            None => factory.clone(),
        };

        let orchestrator = Arc::new(SyncOrchestrator::new(
            sources.clone(),
            documents.clone(),
            chunks.clone(),
            sync_states.clone(),
            connector_factory,
            Arc::new(pipeline),
            registry.clone(),
            search.clone(),
        ));

        Self {
            sources,
            documents,
            chunks,
            sync_states,
            search,
            registry,
            factory,
            orchestrator,
        }
    }

    /// Register a source and return it.
    pub async fn add_source(&self, name: &str) -> Source {
        let source = Source::new(name, ProviderType::Github);
        sercha::domain::ports::SourceStore::create(self.sources.as_ref(), &source)
            .await
            .expect("source created");
        source
    }
}

/// A document shell as a connector would emit it.
pub fn doc_shell(external_id: &str, title: &str, content: &str) -> Document {
    let mut doc = Document::new(external_id, title);
    doc.id = String::new();
    doc.content = content.to_string();
    doc
}

/// One page adding a document.
pub fn add_page(external_id: &str, content: &str, next_cursor: Option<&str>) -> ChangePage {
    ChangePage {
        changes: vec![Change::added(
            external_id,
            doc_shell(external_id, external_id, content),
        )],
        next_cursor: next_cursor.map(str::to_string),
    }
}
