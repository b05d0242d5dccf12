//! Installation store port.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{Installation, ProviderType};

#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn create(&self, installation: &Installation) -> CoreResult<()>;

    async fn get(&self, id: &str) -> CoreResult<Option<Installation>>;

    /// Lookup by `(provider_type, account_id)` — the per-provider unique key.
    async fn get_by_account(
        &self,
        provider_type: ProviderType,
        account_id: &str,
    ) -> CoreResult<Option<Installation>>;

    async fn list(&self) -> CoreResult<Vec<Installation>>;

    async fn update(&self, installation: &Installation) -> CoreResult<()>;

    async fn delete(&self, id: &str) -> CoreResult<()>;
}
