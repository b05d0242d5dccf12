//! Source domain model.
//!
//! A source is one configured ingestion target: a provider plus the
//! credentials (installation) and container selection needed to sync it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::provider::ProviderType;
use crate::domain::ids;

/// A configured ingestion target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Unique identifier.
    pub id: String,
    /// Unique human-readable name.
    pub name: String,
    /// Which provider this source ingests from.
    pub provider_type: ProviderType,
    /// Provider-specific arguments (repository filters, folder ids, ...).
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
    /// Installation carrying the credentials, when the provider needs one.
    pub installation_id: Option<String>,
    /// Disabled sources are skipped by `sync_all` and refuse `sync_source`.
    pub enabled: bool,
    /// Container ids to sync. Empty means everything the credentials can see.
    #[serde(default)]
    pub selected_containers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        let now = Utc::now();
        Self {
            id: ids::short_id(),
            name: name.into(),
            provider_type,
            config: HashMap::new(),
            installation_id: None,
            enabled: true,
            selected_containers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_installation(mut self, installation_id: impl Into<String>) -> Self {
        self.installation_id = Some(installation_id.into());
        self
    }

    pub fn with_containers(mut self, containers: Vec<String>) -> Self {
        self.selected_containers = containers;
        self
    }

    pub fn with_config_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// The containers a sync iterates over.
    ///
    /// An empty selection resolves to a single empty container id, meaning
    /// "all content the credentials can see".
    pub fn containers(&self) -> Vec<String> {
        if self.selected_containers.is_empty() {
            vec![String::new()]
        } else {
            self.selected_containers.clone()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("source name cannot be empty".to_string());
        }
        Ok(())
    }
}
