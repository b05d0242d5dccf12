//! Scripted connector for tests and dev wiring.
//!
//! Plays back a fixed sequence of change pages, optionally followed by a
//! repeating page, and records how often it was called. Lets tests exercise
//! pagination termination, connection failures and fetch errors without a
//! live provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::Source;
use crate::domain::ports::{ChangePage, Connector, ConnectorFactory};

#[derive(Default, Debug)]
pub struct ScriptedConnector {
    pages: Mutex<VecDeque<ChangePage>>,
    /// Page returned forever once the script is exhausted, when set.
    repeat: Option<ChangePage>,
    connection_error: Option<String>,
    fetch_error: Option<String>,
    fetch_calls: AtomicUsize,
}

impl ScriptedConnector {
    /// Play back `pages` in order, then empty pages.
    pub fn with_pages(pages: Vec<ChangePage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            ..Self::default()
        }
    }

    /// Return `page` on every fetch, regardless of cursor.
    pub fn repeating(page: ChangePage) -> Self {
        Self {
            repeat: Some(page),
            ..Self::default()
        }
    }

    /// Fail `test_connection` with the given message.
    pub fn with_connection_error(message: impl Into<String>) -> Self {
        Self {
            connection_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fail every fetch with the given message.
    pub fn with_fetch_error(message: impl Into<String>) -> Self {
        Self {
            fetch_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// How many times `fetch_changes` has been called.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn test_connection(&self, _source: &Source) -> CoreResult<()> {
        match &self.connection_error {
            Some(message) => Err(CoreError::Transport(message.clone())),
            None => Ok(()),
        }
    }

    async fn fetch_changes(
        &self,
        _source: &Source,
        _cursor: Option<&str>,
    ) -> CoreResult<ChangePage> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fetch_error {
            return Err(CoreError::Transport(message.clone()));
        }
        if let Some(page) = self.pages.lock().await.pop_front() {
            return Ok(page);
        }
        if let Some(page) = &self.repeat {
            return Ok(page.clone());
        }
        Ok(ChangePage::default())
    }
}

/// Factory handing out one shared scripted connector for every container.
pub struct ScriptedConnectorFactory {
    connector: Arc<ScriptedConnector>,
}

impl ScriptedConnectorFactory {
    pub fn new(connector: Arc<ScriptedConnector>) -> Self {
        Self { connector }
    }

    /// A factory whose connector always returns empty pages.
    pub fn empty() -> Self {
        Self::new(Arc::new(ScriptedConnector::default()))
    }

    pub fn connector(&self) -> Arc<ScriptedConnector> {
        self.connector.clone()
    }
}

#[async_trait]
impl ConnectorFactory for ScriptedConnectorFactory {
    async fn create(&self, _source: &Source, _container_id: &str) -> CoreResult<Arc<dyn Connector>> {
        Ok(self.connector.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ProviderType;
    use crate::domain::ports::Change;

    #[tokio::test]
    async fn test_scripted_pages_play_in_order() {
        let source = Source::new("s", ProviderType::Github);
        let connector = ScriptedConnector::with_pages(vec![
            ChangePage {
                changes: vec![Change::deleted("ext-1")],
                next_cursor: Some("p2".to_string()),
            },
            ChangePage::default(),
        ]);

        let first = connector.fetch_changes(&source, None).await.unwrap();
        assert_eq!(first.changes.len(), 1);
        assert_eq!(first.next_cursor.as_deref(), Some("p2"));

        let second = connector.fetch_changes(&source, Some("p2")).await.unwrap();
        assert!(second.changes.is_empty());
        assert_eq!(connector.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_connection_error() {
        let source = Source::new("s", ProviderType::Github);
        let connector = ScriptedConnector::with_connection_error("bad credentials");
        assert!(connector.test_connection(&source).await.is_err());
    }
}
