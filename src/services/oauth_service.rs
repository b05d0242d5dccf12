//! OAuth authorization service.
//!
//! Runs the PKCE authorization-code flow per provider and turns completed
//! callbacks into durable installations. State records are single-use with a
//! ten-minute lifetime; the store consumes them atomically on lookup.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids;
use crate::domain::models::installation::parse_scopes;
use crate::domain::models::oauth::InstallationSummary;
use crate::domain::models::{
    AuthorizeResponse, CallbackParams, CallbackResponse, Installation, OAuthState, ProviderConfig,
    ProviderType,
};
use crate::domain::ports::{
    InstallationStore, OAuthHandler, OAuthStateStore, ProviderConfigStore, SourceStore,
};

/// PKCE flow driver and installation registry.
pub struct OAuthService {
    provider_configs: Arc<dyn ProviderConfigStore>,
    states: Arc<dyn OAuthStateStore>,
    installations: Arc<dyn InstallationStore>,
    sources: Arc<dyn SourceStore>,
    handlers: HashMap<ProviderType, Arc<dyn OAuthHandler>>,
}

impl OAuthService {
    pub fn new(
        provider_configs: Arc<dyn ProviderConfigStore>,
        states: Arc<dyn OAuthStateStore>,
        installations: Arc<dyn InstallationStore>,
        sources: Arc<dyn SourceStore>,
    ) -> Self {
        Self {
            provider_configs,
            states,
            installations,
            sources,
            handlers: HashMap::new(),
        }
    }

    /// Register the OAuth handler for a provider.
    pub fn register_handler(&mut self, provider: ProviderType, handler: Arc<dyn OAuthHandler>) {
        self.handlers.insert(provider, handler);
    }

    /// Begin an authorization flow for a provider.
    #[instrument(skip(self), err)]
    pub async fn authorize(&self, provider: ProviderType) -> CoreResult<AuthorizeResponse> {
        let config = self.require_config(provider).await?;
        let handler = self.require_handler(provider)?;

        let state = ids::hex_token(32);
        let code_verifier = ids::hex_token(64);
        let code_challenge = ids::pkce_challenge(&code_verifier);

        let flow = OAuthState::new(
            state.clone(),
            provider,
            code_verifier,
            config.redirect_uri.clone(),
        );
        self.states.put(&flow).await?;

        let authorization_url = handler.build_auth_url(&config, &state, &code_challenge)?;
        info!(provider = %provider, "authorization flow started");

        Ok(AuthorizeResponse {
            authorization_url,
            state,
            expires_at: flow.expires_at.to_rfc3339(),
        })
    }

    /// Complete an authorization flow from the provider's redirect.
    #[instrument(skip(self, params), err)]
    pub async fn callback(&self, params: &CallbackParams) -> CoreResult<CallbackResponse> {
        if let Some(code) = &params.error {
            return Err(CoreError::OAuthProvider {
                code: code.clone(),
                description: params.error_description.clone().unwrap_or_default(),
            });
        }
        if params.state.is_empty() || params.code.is_empty() {
            return Err(CoreError::InvalidInput(
                "state and code are required".to_string(),
            ));
        }

        // Single-use: the lookup consumes the state.
        let Some(flow) = self.states.get_and_delete(&params.state).await? else {
            return Err(CoreError::OAuthInvalidState);
        };

        let config = self.require_config(flow.provider_type).await?;
        let handler = self.require_handler(flow.provider_type)?;

        let grant = handler
            .exchange_code(&config, &params.code, &flow.code_verifier)
            .await?;
        let user = handler.get_user_info(&grant.access_token).await?;
        if user.id.is_empty() {
            return Err(CoreError::Transport(
                "provider returned no account id".to_string(),
            ));
        }

        let now = Utc::now();
        let oauth_expiry = grant.expiry(now);
        let granted_scopes = grant.scope.as_deref().map(parse_scopes);

        let installation = match self
            .installations
            .get_by_account(flow.provider_type, &user.id)
            .await?
        {
            Some(mut existing) => {
                existing.update_secrets(
                    grant.access_token.clone(),
                    grant.refresh_token.clone(),
                    oauth_expiry,
                );
                if let Some(scopes) = granted_scopes {
                    existing.scopes = scopes;
                }
                self.installations.update(&existing).await?;
                info!(installation_id = %existing.id, "installation credentials refreshed");
                existing
            }
            None => {
                let mut created = Installation::new(flow.provider_type, user.id, &user.name);
                created.update_secrets(
                    grant.access_token.clone(),
                    grant.refresh_token.clone(),
                    oauth_expiry,
                );
                created.scopes = granted_scopes.unwrap_or_else(|| {
                    if config.scopes.is_empty() {
                        handler.default_scopes()
                    } else {
                        config.scopes.clone()
                    }
                });
                self.installations.create(&created).await?;
                info!(installation_id = %created.id, "installation created");
                created
            }
        };

        Ok(CallbackResponse {
            message: format!("{} connected", installation.provider_type.display_name()),
            installation: summarize(&installation),
        })
    }

    pub async fn list_installations(&self) -> CoreResult<Vec<InstallationSummary>> {
        Ok(self
            .installations
            .list()
            .await?
            .iter()
            .map(summarize)
            .collect())
    }

    pub async fn get_installation(&self, id: &str) -> CoreResult<InstallationSummary> {
        let Some(installation) = self.installations.get(id).await? else {
            return Err(CoreError::not_found("installation", id.to_string()));
        };
        Ok(summarize(&installation))
    }

    /// Delete an installation, refusing while any source references it.
    #[instrument(skip(self), err)]
    pub async fn delete_installation(&self, id: &str) -> CoreResult<()> {
        let Some(installation) = self.installations.get(id).await? else {
            return Err(CoreError::not_found("installation", id.to_string()));
        };

        let referencing = self.sources.count_by_installation(id).await?;
        if referencing > 0 {
            return Err(CoreError::InUse(format!(
                "installation {} is referenced by {} source(s)",
                id, referencing
            )));
        }

        self.installations.delete(id).await?;
        info!(installation_id = %installation.id, "installation deleted");
        Ok(())
    }

    async fn require_config(&self, provider: ProviderType) -> CoreResult<ProviderConfig> {
        let Some(config) = self.provider_configs.get(provider).await? else {
            return Err(CoreError::OAuthProviderNotFound(provider.to_string()));
        };
        if !config.enabled {
            return Err(CoreError::OAuthProviderDisabled(provider.to_string()));
        }
        if !config.is_configured() {
            warn!(provider = %provider, "provider has no client credentials");
            return Err(CoreError::OAuthProviderNotFound(provider.to_string()));
        }
        Ok(config)
    }

    fn require_handler(&self, provider: ProviderType) -> CoreResult<Arc<dyn OAuthHandler>> {
        self.handlers
            .get(&provider)
            .cloned()
            .ok_or_else(|| CoreError::OAuthProviderNotFound(provider.to_string()))
    }
}

fn summarize(installation: &Installation) -> InstallationSummary {
    InstallationSummary {
        id: installation.id.clone(),
        name: installation.name.clone(),
        provider_type: installation.provider_type,
        account_id: installation.account_id.clone(),
        scopes: installation.scopes.clone(),
    }
}
