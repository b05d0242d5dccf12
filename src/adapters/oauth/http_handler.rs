//! Generic OAuth2 authorization-code handler.
//!
//! One reqwest-backed implementation covers every provider that speaks the
//! standard flow; the per-provider differences are reduced to an endpoint
//! table and a tolerant user-info mapping. Anything beyond that (provider
//! change feeds, API shaping) lives outside this crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::{OAuthUserInfo, ProviderConfig, ProviderType, TokenGrant};
use crate::domain::ports::OAuthHandler;

/// Static OAuth endpoints for one provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub default_scopes: Vec<String>,
}

/// Well-known endpoints per provider. `None` for providers that do not use
/// OAuth (S3 installations carry static keys).
pub fn endpoints(provider: ProviderType) -> Option<ProviderEndpoints> {
    let (auth, token, userinfo, scopes): (&str, &str, &str, &[&str]) = match provider {
        ProviderType::Github => (
            "https://github.com/login/oauth/authorize",
            "https://github.com/login/oauth/access_token",
            "https://api.github.com/user",
            &["repo", "read:user"],
        ),
        ProviderType::Gitlab => (
            "https://gitlab.com/oauth/authorize",
            "https://gitlab.com/oauth/token",
            "https://gitlab.com/api/v4/user",
            &["read_api", "read_user"],
        ),
        ProviderType::Slack => (
            "https://slack.com/oauth/v2/authorize",
            "https://slack.com/api/oauth.v2.access",
            "https://slack.com/api/users.identity",
            &["channels:history", "channels:read", "users:read"],
        ),
        ProviderType::Notion => (
            "https://api.notion.com/v1/oauth/authorize",
            "https://api.notion.com/v1/oauth/token",
            "https://api.notion.com/v1/users/me",
            &[],
        ),
        ProviderType::Confluence | ProviderType::Jira => (
            "https://auth.atlassian.com/authorize",
            "https://auth.atlassian.com/oauth/token",
            "https://api.atlassian.com/me",
            &["read:confluence-content.all", "read:jira-work", "offline_access"],
        ),
        ProviderType::Gdrive | ProviderType::Gdocs => (
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            "https://www.googleapis.com/oauth2/v2/userinfo",
            &["https://www.googleapis.com/auth/drive.readonly"],
        ),
        ProviderType::Linear => (
            "https://linear.app/oauth/authorize",
            "https://api.linear.app/oauth/token",
            "https://api.linear.app/oauth/userinfo",
            &["read"],
        ),
        ProviderType::Dropbox => (
            "https://www.dropbox.com/oauth2/authorize",
            "https://api.dropboxapi.com/oauth2/token",
            "https://api.dropboxapi.com/2/users/get_current_account",
            &["files.content.read", "files.metadata.read"],
        ),
        ProviderType::S3 => return None,
    };
    Some(ProviderEndpoints {
        auth_url: auth.to_string(),
        token_url: token.to_string(),
        userinfo_url: userinfo.to_string(),
        default_scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
    })
}

/// Standard authorization-code + PKCE flow over HTTP.
pub struct HttpOAuthHandler {
    endpoints: ProviderEndpoints,
    client: reqwest::Client,
}

impl HttpOAuthHandler {
    pub fn new(endpoints: ProviderEndpoints) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("sercha")
            .build()
            .map_err(|err| CoreError::Transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { endpoints, client })
    }

    /// Build a handler for a known provider.
    pub fn for_provider(provider: ProviderType) -> CoreResult<Self> {
        let Some(endpoints) = endpoints(provider) else {
            return Err(CoreError::OAuthProviderNotFound(provider.to_string()));
        };
        Self::new(endpoints)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> CoreResult<TokenGrant> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|err| CoreError::Transport(format!("token request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CoreError::Transport(format!("token response unreadable: {err}")))?;
        if !status.is_success() {
            return Err(CoreError::OAuthProvider {
                code: status.as_str().to_string(),
                description: body,
            });
        }

        // Providers report flow errors in a 200 body surprisingly often.
        let value: Value = serde_json::from_str(&body)
            .map_err(|err| CoreError::Serialization(format!("bad token response: {err}")))?;
        if let Some(code) = value.get("error").and_then(Value::as_str) {
            return Err(CoreError::OAuthProvider {
                code: code.to_string(),
                description: value
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let grant: TokenGrant = serde_json::from_value(value)
            .map_err(|err| CoreError::Serialization(format!("bad token grant: {err}")))?;
        if grant.access_token.is_empty() {
            return Err(CoreError::Transport(
                "token response carried no access token".to_string(),
            ));
        }
        Ok(grant)
    }
}

#[async_trait]
impl OAuthHandler for HttpOAuthHandler {
    fn build_auth_url(
        &self,
        config: &ProviderConfig,
        state: &str,
        code_challenge: &str,
    ) -> CoreResult<String> {
        let scopes = if config.scopes.is_empty() {
            self.endpoints.default_scopes.join(" ")
        } else {
            config.scopes.join(" ")
        };

        let url = reqwest::Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("scope", scopes.as_str()),
            ],
        )
        .map_err(|err| CoreError::InvalidInput(format!("bad authorization URL: {err}")))?;
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        config: &ProviderConfig,
        code: &str,
        code_verifier: &str,
    ) -> CoreResult<TokenGrant> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    async fn refresh_token(
        &self,
        config: &ProviderConfig,
        refresh_token: &str,
    ) -> CoreResult<TokenGrant> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ])
        .await
    }

    async fn get_user_info(&self, access_token: &str) -> CoreResult<OAuthUserInfo> {
        let response = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| CoreError::Transport(format!("userinfo request failed: {err}")))?;

        if !response.status().is_success() {
            return Err(CoreError::Transport(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|err| CoreError::Serialization(format!("bad userinfo response: {err}")))?;
        Ok(map_user_info(&value))
    }

    fn default_scopes(&self) -> Vec<String> {
        self.endpoints.default_scopes.clone()
    }
}

/// Map a provider's identity payload onto the common shape.
///
/// Providers disagree on field names; this tries the usual candidates in
/// order. Numeric ids are stringified.
fn map_user_info(value: &Value) -> OAuthUserInfo {
    let id = ["id", "sub", "account_id", "user_id"]
        .iter()
        .find_map(|key| match value.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    let name = ["name", "login", "username", "display_name"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let email = value
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    OAuthUserInfo { id, name, email }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(server_url: &str) -> HttpOAuthHandler {
        HttpOAuthHandler::new(ProviderEndpoints {
            auth_url: "https://provider.test/authorize".to_string(),
            token_url: format!("{server_url}/token"),
            userinfo_url: format!("{server_url}/user"),
            default_scopes: vec!["repo".to_string()],
        })
        .unwrap()
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            client_id: "client-1".to_string(),
            client_secret: "secret-1".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scopes: vec![],
            enabled: true,
        }
    }

    #[test]
    fn test_build_auth_url_carries_pkce_params() {
        let handler = handler("http://unused");
        let url = handler
            .build_auth_url(&config(), "state-123", "challenge-456")
            .unwrap();

        assert!(url.starts_with("https://provider.test/authorize?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("state=state-123"));
        assert!(url.contains("code_challenge=challenge-456"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("scope=repo"));
    }

    #[tokio::test]
    async fn test_exchange_code_posts_verifier() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "auth-code".into()),
                mockito::Matcher::UrlEncoded("code_verifier".into(), "verifier-1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"at-1","refresh_token":"rt-1","expires_in":3600,"scope":"repo"}"#)
            .create_async()
            .await;

        let grant = handler(&server.url())
            .exchange_code(&config(), "auth-code", "verifier-1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(grant.access_token, "at-1");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(grant.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_error_in_200_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"error":"invalid_grant","error_description":"code expired"}"#)
            .create_async()
            .await;

        let err = handler(&server.url())
            .exchange_code(&config(), "stale", "v")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::OAuthProvider { code, .. } if code == "invalid_grant"));
    }

    #[tokio::test]
    async fn test_get_user_info_maps_numeric_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user")
            .match_header("authorization", "Bearer at-1")
            .with_status(200)
            .with_body(r#"{"id":12345,"login":"octocat","email":"octo@example.com"}"#)
            .create_async()
            .await;

        let user = handler(&server.url()).get_user_info("at-1").await.unwrap();
        assert_eq!(user.id, "12345");
        assert_eq!(user.name, "octocat");
        assert_eq!(user.email.as_deref(), Some("octo@example.com"));
    }

    #[test]
    fn test_endpoint_table_covers_oauth_providers() {
        for provider in ProviderType::all() {
            match provider {
                ProviderType::S3 => assert!(endpoints(*provider).is_none()),
                _ => assert!(endpoints(*provider).is_some(), "missing endpoints for {provider}"),
            }
        }
    }

    #[test]
    fn test_map_user_info_fallbacks() {
        let value = serde_json::json!({"sub": "abc", "display_name": "Display"});
        let user = map_user_info(&value);
        assert_eq!(user.id, "abc");
        assert_eq!(user.name, "Display");
        assert!(user.email.is_none());
    }
}
