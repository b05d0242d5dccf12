//! User store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<User>>;

    /// Lookup by canonical (lowercased, trimmed) email.
    async fn get_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn update(&self, user: &User) -> CoreResult<()>;

    async fn list(&self) -> CoreResult<Vec<User>>;
}
