//! Installation domain model.
//!
//! An installation is a bound set of provider credentials produced by a
//! completed OAuth flow. Token fields are redacted from `Debug` output so
//! installations can be logged safely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::ProviderType;
use crate::domain::ids;

/// Stored provider credentials tied to an external account.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    /// Display name, derived from the provider and account at creation.
    pub name: String,
    pub provider_type: ProviderType,
    /// How the credentials were obtained (currently always "oauth").
    pub auth_method: String,
    /// Provider-side account identifier. Unique per provider type.
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// When the access token expires, if the provider reports it.
    pub oauth_expiry: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub fn new(
        provider_type: ProviderType,
        account_id: impl Into<String>,
        account_name: &str,
    ) -> Self {
        let account_id = account_id.into();
        let label = if account_name.is_empty() {
            account_id.clone()
        } else {
            account_name.to_string()
        };
        let now = Utc::now();
        Self {
            id: ids::short_id(),
            name: format!("{} ({})", provider_type.display_name(), label),
            provider_type,
            auth_method: "oauth".to_string(),
            account_id,
            access_token: String::new(),
            refresh_token: None,
            oauth_expiry: None,
            scopes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the secret material after a token exchange or refresh.
    pub fn update_secrets(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        oauth_expiry: Option<DateTime<Utc>>,
    ) {
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.oauth_expiry = oauth_expiry;
        self.updated_at = Utc::now();
    }

    /// Whether the access token is past its reported expiry.
    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.oauth_expiry.is_some_and(|expiry| expiry <= now)
    }
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider_type", &self.provider_type)
            .field("auth_method", &self.auth_method)
            .field("account_id", &self.account_id)
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("oauth_expiry", &self.oauth_expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Parse an OAuth scope string into an ordered, first-seen-unique list.
///
/// Providers disagree on the wire format: some separate scopes with spaces,
/// some with commas.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.split(|c: char| c == ' ' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}
