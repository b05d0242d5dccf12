//! In-memory store implementations.
//!
//! Every store serialises through a `tokio::sync::RwLock`, which gives the
//! operation-level atomicity the ports require. Maps are keyed by the
//! entity's primary key; secondary lookups scan.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{
    Chunk, Document, Installation, OAuthState, ProviderConfig, ProviderType, ScheduledTask,
    Session, Source, SyncState, User,
};
use crate::domain::ports::{
    ChunkStore, DocumentStore, InstallationStore, OAuthStateStore, ProviderConfigStore,
    ScheduleStore, SessionStore, SourceStore, SyncStateStore, UserStore,
};

// ============================================================================
// Sources
// ============================================================================

#[derive(Default)]
pub struct MemorySourceStore {
    items: RwLock<HashMap<String, Source>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn create(&self, source: &Source) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if items.values().any(|s| s.name == source.name) {
            return Err(CoreError::already_exists("source", source.name.clone()));
        }
        items.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Source>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<Source>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list(&self) -> CoreResult<Vec<Source>> {
        let mut sources: Vec<Source> = self.items.read().await.values().cloned().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    async fn update(&self, source: &Source) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if !items.contains_key(&source.id) {
            return Err(CoreError::not_found("source", source.id.clone()));
        }
        items.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.items.write().await.remove(id);
        Ok(())
    }

    async fn count_by_installation(&self, installation_id: &str) -> CoreResult<u64> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .filter(|s| s.installation_id.as_deref() == Some(installation_id))
            .count() as u64)
    }
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Default)]
pub struct MemoryDocumentStore {
    items: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert(&self, document: &Document) -> CoreResult<()> {
        self.items
            .write()
            .await
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Document>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_external_id(
        &self,
        source_id: &str,
        external_id: &str,
    ) -> CoreResult<Option<Document>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|d| d.source_id == source_id && d.external_id == external_id)
            .cloned())
    }

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .items
            .read()
            .await
            .values()
            .filter(|d| d.source_id == source_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(documents)
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.items.write().await.remove(id);
        Ok(())
    }

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, d| d.source_id != source_id);
        Ok((before - items.len()) as u64)
    }

    async fn count(&self) -> CoreResult<u64> {
        Ok(self.items.read().await.len() as u64)
    }
}

// ============================================================================
// Chunks
// ============================================================================

#[derive(Default)]
pub struct MemoryChunkStore {
    items: RwLock<HashMap<String, Chunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn upsert_batch(&self, chunks: &[Chunk]) -> CoreResult<()> {
        let mut items = self.items.write().await;
        for chunk in chunks {
            items.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Chunk>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn list_by_document(&self, document_id: &str) -> CoreResult<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .items
            .read()
            .await
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.position);
        Ok(chunks)
    }

    async fn delete_by_document(&self, document_id: &str) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, c| c.document_id != document_id);
        Ok((before - items.len()) as u64)
    }

    async fn delete_by_source(&self, source_id: &str) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, c| c.source_id != source_id);
        Ok((before - items.len()) as u64)
    }

    async fn count(&self) -> CoreResult<u64> {
        Ok(self.items.read().await.len() as u64)
    }
}

// ============================================================================
// Sync state
// ============================================================================

#[derive(Default)]
pub struct MemorySyncStateStore {
    items: RwLock<HashMap<String, SyncState>>,
}

impl MemorySyncStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStateStore for MemorySyncStateStore {
    async fn get(&self, source_id: &str) -> CoreResult<Option<SyncState>> {
        Ok(self.items.read().await.get(source_id).cloned())
    }

    async fn upsert(&self, state: &SyncState) -> CoreResult<()> {
        self.items
            .write()
            .await
            .insert(state.source_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, source_id: &str) -> CoreResult<()> {
        self.items.write().await.remove(source_id);
        Ok(())
    }
}

// ============================================================================
// Installations
// ============================================================================

#[derive(Default)]
pub struct MemoryInstallationStore {
    items: RwLock<HashMap<String, Installation>>,
}

impl MemoryInstallationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstallationStore for MemoryInstallationStore {
    async fn create(&self, installation: &Installation) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if items.values().any(|i| {
            i.provider_type == installation.provider_type && i.account_id == installation.account_id
        }) {
            return Err(CoreError::already_exists(
                "installation",
                format!("{}/{}", installation.provider_type, installation.account_id),
            ));
        }
        items.insert(installation.id.clone(), installation.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Installation>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_account(
        &self,
        provider_type: ProviderType,
        account_id: &str,
    ) -> CoreResult<Option<Installation>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|i| i.provider_type == provider_type && i.account_id == account_id)
            .cloned())
    }

    async fn list(&self) -> CoreResult<Vec<Installation>> {
        let mut installations: Vec<Installation> =
            self.items.read().await.values().cloned().collect();
        installations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(installations)
    }

    async fn update(&self, installation: &Installation) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if !items.contains_key(&installation.id) {
            return Err(CoreError::not_found("installation", installation.id.clone()));
        }
        items.insert(installation.id.clone(), installation.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.items.write().await.remove(id);
        Ok(())
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct MemoryUserStore {
    items: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if items
            .values()
            .any(|u| u.email == user.email && u.team_id == user.team_id)
        {
            return Err(CoreError::already_exists("user", user.email.clone()));
        }
        items.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<User>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if !items.contains_key(&user.id) {
            return Err(CoreError::not_found("user", user.id.clone()));
        }
        items.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list(&self) -> CoreResult<Vec<User>> {
        let mut users: Vec<User> = self.items.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Default)]
pub struct MemorySessionStore {
    items: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &Session) -> CoreResult<()> {
        self.items
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<Session>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_refresh_token(&self, refresh_token: &str) -> CoreResult<Option<Session>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|s| s.refresh_token == refresh_token)
            .cloned())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.items.write().await.remove(id);
        Ok(())
    }

    async fn delete_by_user(&self, user_id: &str) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, s| s.user_id != user_id);
        Ok((before - items.len()) as u64)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, s| !s.is_expired(now));
        Ok((before - items.len()) as u64)
    }
}

// ============================================================================
// OAuth states
// ============================================================================

#[derive(Default)]
pub struct MemoryOAuthStateStore {
    items: RwLock<HashMap<String, OAuthState>>,
}

impl MemoryOAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStateStore for MemoryOAuthStateStore {
    async fn put(&self, state: &OAuthState) -> CoreResult<()> {
        self.items
            .write()
            .await
            .insert(state.state.clone(), state.clone());
        Ok(())
    }

    async fn get_and_delete(&self, state: &str) -> CoreResult<Option<OAuthState>> {
        // Removal and lookup happen under one write lock: single-use.
        let record = self.items.write().await.remove(state);
        Ok(record.filter(|r| !r.is_expired(Utc::now())))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, s| !s.is_expired(now));
        Ok((before - items.len()) as u64)
    }
}

// ============================================================================
// Provider configs
// ============================================================================

/// Provider configs resolved from the loaded configuration file.
#[derive(Default)]
pub struct MemoryProviderConfigStore {
    items: HashMap<ProviderType, ProviderConfig>,
}

impl MemoryProviderConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `oauth` section of the config file, ignoring unknown
    /// provider names.
    pub fn from_config(oauth: &HashMap<String, ProviderConfig>) -> Self {
        let mut items = HashMap::new();
        for (name, config) in oauth {
            if let Some(provider) = ProviderType::from_str(name) {
                items.insert(provider, config.clone());
            }
        }
        Self { items }
    }

    pub fn with_provider(mut self, provider: ProviderType, config: ProviderConfig) -> Self {
        self.items.insert(provider, config);
        self
    }
}

#[async_trait]
impl ProviderConfigStore for MemoryProviderConfigStore {
    async fn get(&self, provider_type: ProviderType) -> CoreResult<Option<ProviderConfig>> {
        Ok(self.items.get(&provider_type).cloned())
    }

    async fn list(&self) -> CoreResult<Vec<(ProviderType, ProviderConfig)>> {
        Ok(self.items.iter().map(|(p, c)| (*p, c.clone())).collect())
    }
}

// ============================================================================
// Scheduled tasks
// ============================================================================

#[derive(Default)]
pub struct MemoryScheduleStore {
    items: RwLock<HashMap<String, ScheduledTask>>,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn create(&self, schedule: &ScheduledTask) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if items.values().any(|s| s.name == schedule.name) {
            return Err(CoreError::already_exists("scheduled task", schedule.name.clone()));
        }
        items.insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CoreResult<Option<ScheduledTask>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> CoreResult<Option<ScheduledTask>> {
        Ok(self
            .items
            .read()
            .await
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn list(&self) -> CoreResult<Vec<ScheduledTask>> {
        let mut schedules: Vec<ScheduledTask> = self.items.read().await.values().cloned().collect();
        schedules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schedules)
    }

    async fn get_due(&self, now: DateTime<Utc>) -> CoreResult<Vec<ScheduledTask>> {
        let mut due: Vec<ScheduledTask> = self
            .items
            .read()
            .await
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.next_run.cmp(&b.next_run));
        Ok(due)
    }

    async fn update(&self, schedule: &ScheduledTask) -> CoreResult<()> {
        let mut items = self.items.write().await;
        if !items.contains_key(&schedule.id) {
            return Err(CoreError::not_found("scheduled task", schedule.id.clone()));
        }
        items.insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.items.write().await.remove(id);
        Ok(())
    }
}
