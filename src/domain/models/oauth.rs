//! OAuth flow domain models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;

/// Lifetime of a pending authorization flow.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Ephemeral PKCE flow record, single-use by construction: retrieval from
/// the state store consumes and deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthState {
    pub state: String,
    pub provider_type: ProviderType,
    pub code_verifier: String,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn new(
        state: String,
        provider_type: ProviderType,
        code_verifier: String,
        redirect_uri: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            state,
            provider_type,
            code_verifier,
            redirect_uri,
            created_at: now,
            expires_at: now + Duration::minutes(OAUTH_STATE_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// OAuth client configuration for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Scope overrides; empty means the handler's defaults.
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ProviderConfig {
    /// A provider with no client credentials is treated as absent.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Response of the authorize step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub authorization_url: String,
    pub state: String,
    /// RFC 3339 expiry of the pending flow.
    pub expires_at: String,
}

/// Token material returned by a provider's token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, when reported.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenGrant {
    /// Absolute expiry derived from `expires_in`, relative to `now`.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

/// Provider-side identity attached to the authorizing account.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OAuthUserInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The non-sensitive slice of an installation returned by the callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationSummary {
    pub id: String,
    pub name: String,
    pub provider_type: ProviderType,
    pub account_id: String,
    pub scopes: Vec<String>,
}

/// Result of a completed callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub installation: InstallationSummary,
    pub message: String,
}

/// Query parameters a provider sends back to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
