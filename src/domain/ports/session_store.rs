//! Session store port.
//!
//! The store must be externally atomic at the operation level; the in-memory
//! adapter serialises through a mutex, the sqlite adapter through the
//! database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CoreResult;
use crate::domain::models::Session;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<Session>>;

    async fn get_by_refresh_token(&self, refresh_token: &str) -> CoreResult<Option<Session>>;

    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// Delete every session of a user. Returns the number removed.
    async fn delete_by_user(&self, user_id: &str) -> CoreResult<u64>;

    /// Drop sessions whose expiry is at or before the given instant.
    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64>;
}
