//! Provider configuration store port.
//!
//! OAuth client credentials per provider. The shipped adapter is backed by
//! the loaded configuration file.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{ProviderConfig, ProviderType};

#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    async fn get(&self, provider_type: ProviderType) -> CoreResult<Option<ProviderConfig>>;

    async fn list(&self) -> CoreResult<Vec<(ProviderType, ProviderConfig)>>;
}
