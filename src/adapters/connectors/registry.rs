//! Provider-tagged connector factory registry.
//!
//! Concrete provider factories register by tag; the orchestrator consumes
//! the registry through the uniform `ConnectorFactory` port with no
//! provider-specific branching.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{ProviderType, Source};
use crate::domain::ports::{Connector, ConnectorFactory};

#[derive(Default)]
pub struct ConnectorRegistry {
    factories: HashMap<ProviderType, Arc<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: ProviderType, factory: Arc<dyn ConnectorFactory>) {
        self.factories.insert(provider, factory);
    }

    pub fn supports(&self, provider: ProviderType) -> bool {
        self.factories.contains_key(&provider)
    }
}

#[async_trait]
impl ConnectorFactory for ConnectorRegistry {
    async fn create(&self, source: &Source, container_id: &str) -> CoreResult<Arc<dyn Connector>> {
        let Some(factory) = self.factories.get(&source.provider_type) else {
            return Err(CoreError::not_found(
                "connector",
                source.provider_type.to_string(),
            ));
        };
        factory.create(source, container_id).await
    }
}
