//! Connector port: the change-stream interface every provider adapter
//! implements.
//!
//! The orchestrator owns the pagination loop; connectors only answer "what
//! changed after this cursor". This centralises cancellation checks and the
//! pagination termination rules in one place.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::CoreResult;
use crate::domain::models::{Document, Source};

/// Kind of change emitted by a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// One add/modify/delete record from a provider's change stream.
#[derive(Debug, Clone)]
pub struct Change {
    /// Provider-side identifier of the item.
    pub external_id: String,
    pub change_type: ChangeType,
    /// Document shell (title, mime type, metadata). Absent for deletions.
    pub document: Option<Document>,
    /// Raw content when the provider inlines it; otherwise the document
    /// shell already carries it.
    pub content: Option<String>,
}

impl Change {
    pub fn added(external_id: impl Into<String>, document: Document) -> Self {
        Self {
            external_id: external_id.into(),
            change_type: ChangeType::Added,
            document: Some(document),
            content: None,
        }
    }

    pub fn modified(external_id: impl Into<String>, document: Document) -> Self {
        Self {
            external_id: external_id.into(),
            change_type: ChangeType::Modified,
            document: Some(document),
            content: None,
        }
    }

    pub fn deleted(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            change_type: ChangeType::Deleted,
            document: None,
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// One page of a change stream.
#[derive(Debug, Clone, Default)]
pub struct ChangePage {
    pub changes: Vec<Change>,
    /// Cursor for the next page. Empty/None terminates pagination.
    pub next_cursor: Option<String>,
}

/// A change-stream reader scoped to one `(source, container)` pair.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug {
    /// Verify the credentials and reachability of the provider.
    async fn test_connection(&self, source: &Source) -> CoreResult<()>;

    /// Fetch the changes after `cursor`. `None` starts from the beginning.
    async fn fetch_changes(&self, source: &Source, cursor: Option<&str>) -> CoreResult<ChangePage>;
}

/// Creates connectors per `(source, container)`.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    async fn create(&self, source: &Source, container_id: &str) -> CoreResult<Arc<dyn Connector>>;
}
