//! Authentication core tests over the memory stores and the real
//! argon2/JWT adapter.

use std::sync::Arc;

use chrono::{Duration, Utc};

use sercha::adapters::auth::DefaultAuthAdapter;
use sercha::adapters::memory::{MemorySessionStore, MemoryUserStore};
use sercha::domain::errors::CoreError;
use sercha::domain::models::{TokenClaims, User, UserRole};
use sercha::domain::ports::{AuthAdapter, SessionStore, UserStore};
use sercha::services::SessionService;

struct AuthFixture {
    users: Arc<MemoryUserStore>,
    sessions: Arc<MemorySessionStore>,
    adapter: Arc<DefaultAuthAdapter>,
    service: SessionService,
}

fn fixture() -> AuthFixture {
    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let adapter = Arc::new(DefaultAuthAdapter::new(b"integration-secret".to_vec()));
    let service = SessionService::new(
        users.clone(),
        sessions.clone(),
        adapter.clone(),
        Duration::hours(24),
    );
    AuthFixture {
        users,
        sessions,
        adapter,
        service,
    }
}

async fn seed_user(fixture: &AuthFixture, email: &str, password: &str, active: bool) -> User {
    let mut user = User::new(email, "Test User", "team-1").with_role(UserRole::Member);
    user.password_hash = fixture.adapter.hash_password(password).unwrap();
    user.active = active;
    fixture.users.create(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_authenticate_valid_credentials() {
    let fixture = fixture();
    seed_user(&fixture, "test@example.com", "password123", true).await;

    let tokens = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap();

    assert!(!tokens.token.is_empty());
    assert!(!tokens.refresh_token.is_empty());
    assert_eq!(tokens.user.email, "test@example.com");

    // The issued token validates and resolves the same identity.
    let identity = fixture.service.validate_token(&tokens.token).await.unwrap();
    assert_eq!(identity.email, "test@example.com");
    assert_eq!(identity.team_id, "team-1");
}

#[tokio::test]
async fn test_authenticate_inactive_user() {
    let fixture = fixture();
    seed_user(&fixture, "test@example.com", "password123", false).await;

    let err = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized(_)));
}

#[tokio::test]
async fn test_validate_token_expired_claims() {
    let fixture = fixture();
    let now = Utc::now().timestamp();
    let claims = TokenClaims {
        sub: "u1".to_string(),
        email: "t@e.c".to_string(),
        role: UserRole::Member,
        team_id: "team-1".to_string(),
        sid: "s1".to_string(),
        iat: now - 100,
        exp: now - 1,
    };
    let token = fixture.adapter.generate_token(&claims).unwrap();

    let err = fixture.service.validate_token(&token).await.unwrap_err();
    assert!(matches!(err, CoreError::TokenExpired));
}

#[tokio::test]
async fn test_validate_token_after_logout() {
    let fixture = fixture();
    seed_user(&fixture, "test@example.com", "password123", true).await;

    let tokens = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap();

    fixture.service.logout(&tokens.token).await.unwrap();

    let err = fixture.service.validate_token(&tokens.token).await.unwrap_err();
    assert!(matches!(err, CoreError::SessionNotFound));
}

#[tokio::test]
async fn test_refresh_rotates_tokens_and_invalidates_old_session() {
    let fixture = fixture();
    seed_user(&fixture, "test@example.com", "password123", true).await;

    let original = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap();

    let refreshed = fixture
        .service
        .refresh(&original.refresh_token)
        .await
        .unwrap();
    assert_ne!(refreshed.refresh_token, original.refresh_token);
    assert_ne!(refreshed.token, original.token);

    // The old refresh token is gone with its session.
    let err = fixture
        .service
        .refresh(&original.refresh_token)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::TokenInvalid));

    // The new token validates.
    fixture.service.validate_token(&refreshed.token).await.unwrap();
}

#[tokio::test]
async fn test_change_password_invalidates_sessions() {
    let fixture = fixture();
    let user = seed_user(&fixture, "test@example.com", "password123", true).await;

    let tokens = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap();

    fixture
        .service
        .change_password(&user.id, "password123", "better-password")
        .await
        .unwrap();

    // The prior session is absent from the store.
    let identity = fixture.service.validate_token(&tokens.token).await;
    assert!(matches!(identity.unwrap_err(), CoreError::SessionNotFound));

    // Old password no longer works, the new one does.
    assert!(fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .is_err());
    fixture
        .service
        .authenticate("test@example.com", "better-password", None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_logout_all_clears_every_session() {
    let fixture = fixture();
    let user = seed_user(&fixture, "test@example.com", "password123", true).await;

    for _ in 0..3 {
        fixture
            .service
            .authenticate("test@example.com", "password123", None, None)
            .await
            .unwrap();
    }

    let removed = fixture.service.logout_all(&user.id).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(fixture.sessions.delete_by_user(&user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_expired_session_invalidates_valid_claims() {
    let fixture = fixture();
    seed_user(&fixture, "test@example.com", "password123", true).await;

    let tokens = fixture
        .service
        .authenticate("test@example.com", "password123", None, None)
        .await
        .unwrap();

    // Force-expire the stored session while the JWT itself is still live.
    let claims = fixture.adapter.parse_token(&tokens.token).unwrap();
    let mut session = fixture.sessions.get(&claims.sid).await.unwrap().unwrap();
    session.expires_at = Utc::now() - Duration::seconds(1);
    fixture.sessions.delete(&session.id).await.unwrap();
    fixture.sessions.create(&session).await.unwrap();

    let err = fixture.service.validate_token(&tokens.token).await.unwrap_err();
    assert!(matches!(err, CoreError::TokenExpired));
}
