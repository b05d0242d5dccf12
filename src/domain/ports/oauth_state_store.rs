//! OAuth state store port.
//!
//! States are single-use: `get_and_delete` must be one atomic step so a
//! replayed callback can never observe the same state twice.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::CoreResult;
use crate::domain::models::OAuthState;

#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn put(&self, state: &OAuthState) -> CoreResult<()>;

    /// Consume a state: return it and remove it in a single atomic step.
    /// Expired states are treated as absent.
    async fn get_and_delete(&self, state: &str) -> CoreResult<Option<OAuthState>>;

    /// Drop states whose expiry is at or before the given instant.
    async fn purge_expired(&self, now: DateTime<Utc>) -> CoreResult<u64>;
}
