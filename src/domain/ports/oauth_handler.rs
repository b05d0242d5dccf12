//! OAuth handler port: the per-provider authorization-code flow surface.

use async_trait::async_trait;

use crate::domain::errors::CoreResult;
use crate::domain::models::{OAuthUserInfo, ProviderConfig, TokenGrant};

/// Per-provider OAuth2 + PKCE operations.
#[async_trait]
pub trait OAuthHandler: Send + Sync {
    /// Build the provider authorization URL with client id, redirect URI,
    /// state, PKCE challenge and scopes.
    fn build_auth_url(
        &self,
        config: &ProviderConfig,
        state: &str,
        code_challenge: &str,
    ) -> CoreResult<String>;

    /// Exchange an authorization code (plus the PKCE verifier) for tokens.
    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
        code_verifier: &str,
    ) -> CoreResult<TokenGrant>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_token(
        &self,
        config: &ProviderConfig,
        refresh_token: &str,
    ) -> CoreResult<TokenGrant>;

    /// Fetch the authorizing account's identity.
    async fn get_user_info(&self, access_token: &str) -> CoreResult<OAuthUserInfo>;

    /// Scopes requested when the provider config does not override them.
    fn default_scopes(&self) -> Vec<String>;
}
