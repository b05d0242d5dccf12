//! OAuth flow tests: single-use state and installation lifecycle.

use std::sync::Arc;

use async_trait::async_trait;

use sercha::adapters::memory::{
    MemoryInstallationStore, MemoryOAuthStateStore, MemoryProviderConfigStore, MemorySourceStore,
};
use sercha::domain::errors::{CoreError, CoreResult};
use sercha::domain::models::{
    CallbackParams, OAuthUserInfo, ProviderConfig, ProviderType, Source, TokenGrant,
};
use sercha::domain::ports::{InstallationStore, OAuthHandler, SourceStore};
use sercha::services::OAuthService;

struct StubHandler;

#[async_trait]
impl OAuthHandler for StubHandler {
    fn build_auth_url(
        &self,
        config: &ProviderConfig,
        state: &str,
        code_challenge: &str,
    ) -> CoreResult<String> {
        Ok(format!(
            "https://github.test/authorize?client_id={}&state={state}&code_challenge={code_challenge}",
            config.client_id
        ))
    }

    async fn exchange_code(
        &self,
        _config: &ProviderConfig,
        _code: &str,
        _code_verifier: &str,
    ) -> CoreResult<TokenGrant> {
        Ok(TokenGrant {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
            scope: Some("repo".to_string()),
            token_type: Some("bearer".to_string()),
        })
    }

    async fn refresh_token(
        &self,
        _config: &ProviderConfig,
        _refresh_token: &str,
    ) -> CoreResult<TokenGrant> {
        Ok(TokenGrant::default())
    }

    async fn get_user_info(&self, _access_token: &str) -> CoreResult<OAuthUserInfo> {
        Ok(OAuthUserInfo {
            id: "acct-42".to_string(),
            name: "octocat".to_string(),
            email: None,
        })
    }

    fn default_scopes(&self) -> Vec<String> {
        vec!["repo".to_string()]
    }
}

struct OAuthFixture {
    installations: Arc<MemoryInstallationStore>,
    sources: Arc<MemorySourceStore>,
    service: OAuthService,
}

fn fixture() -> OAuthFixture {
    let configs = MemoryProviderConfigStore::new().with_provider(
        ProviderType::Github,
        ProviderConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost/callback".to_string(),
            scopes: vec![],
            enabled: true,
        },
    );
    let installations = Arc::new(MemoryInstallationStore::new());
    let sources = Arc::new(MemorySourceStore::new());

    let mut service = OAuthService::new(
        Arc::new(configs),
        Arc::new(MemoryOAuthStateStore::new()),
        installations.clone(),
        sources.clone(),
    );
    service.register_handler(ProviderType::Github, Arc::new(StubHandler));

    OAuthFixture {
        installations,
        sources,
        service,
    }
}

#[tokio::test]
async fn test_full_flow_and_state_single_use() {
    let fixture = fixture();

    let authorize = fixture.service.authorize(ProviderType::Github).await.unwrap();
    assert!(authorize.authorization_url.contains(&authorize.state));
    assert_eq!(authorize.state.len(), 32);

    let params = CallbackParams {
        state: authorize.state.clone(),
        code: "auth-code".to_string(),
        ..Default::default()
    };

    // First callback succeeds and produces an installation.
    let response = fixture.service.callback(&params).await.unwrap();
    assert_eq!(response.installation.account_id, "acct-42");
    assert_eq!(fixture.installations.list().await.unwrap().len(), 1);

    // Replaying the same state is rejected: it was consumed.
    let err = fixture.service.callback(&params).await.unwrap_err();
    assert!(matches!(err, CoreError::OAuthInvalidState));
}

#[tokio::test]
async fn test_repeat_authorization_updates_installation() {
    let fixture = fixture();

    for _ in 0..2 {
        let authorize = fixture.service.authorize(ProviderType::Github).await.unwrap();
        fixture
            .service
            .callback(&CallbackParams {
                state: authorize.state,
                code: "auth-code".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    // Same provider account: one installation, refreshed in place.
    assert_eq!(fixture.installations.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_provider_config_rejected() {
    let fixture = fixture();
    let err = fixture.service.authorize(ProviderType::Slack).await.unwrap_err();
    assert!(matches!(err, CoreError::OAuthProviderNotFound(_)));
}

#[tokio::test]
async fn test_delete_installation_blocked_while_referenced() {
    let fixture = fixture();

    let authorize = fixture.service.authorize(ProviderType::Github).await.unwrap();
    let response = fixture
        .service
        .callback(&CallbackParams {
            state: authorize.state,
            code: "auth-code".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let installation_id = response.installation.id;

    let source =
        Source::new("repo", ProviderType::Github).with_installation(installation_id.clone());
    fixture.sources.create(&source).await.unwrap();

    // Blocked while the source references it.
    let err = fixture
        .service
        .delete_installation(&installation_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InUse(_)));

    // Removing the source unblocks deletion.
    fixture.sources.delete(&source.id).await.unwrap();
    fixture
        .service
        .delete_installation(&installation_id)
        .await
        .unwrap();
    assert!(fixture.installations.get(&installation_id).await.unwrap().is_none());
}
