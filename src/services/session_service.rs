//! Session and token service.
//!
//! Issues opaque-bound bearer tokens: the JWT carries a `sid` claim pointing
//! at a stored session, so revocation is a session-store delete. A token
//! validates only while both the claim expiry and the stored session are
//! still live.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, instrument};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::ids;
use crate::domain::models::{AuthTokens, AuthenticatedUser, Session, TokenClaims, User};
use crate::domain::models::auth::normalize_email;
use crate::domain::ports::{AuthAdapter, SessionStore, UserStore};

/// Authentication core: login, token validation, refresh, logout.
pub struct SessionService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    auth: Arc<dyn AuthAdapter>,
    token_ttl: Duration,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        auth: Arc<dyn AuthAdapter>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            auth,
            token_ttl,
        }
    }

    /// Authenticate with email and password, producing a new session.
    #[instrument(skip(self, password), err)]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> CoreResult<AuthTokens> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CoreError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let email = normalize_email(email);
        let Some(mut user) = self.users.get_by_email(&email).await? else {
            return Err(CoreError::InvalidCredentials);
        };
        if !user.active {
            return Err(CoreError::Unauthorized("user is inactive".to_string()));
        }
        if !self.auth.verify_password(password, &user.password_hash)? {
            return Err(CoreError::InvalidCredentials);
        }

        let tokens = self
            .create_session(&user, user_agent, ip_address)
            .await?;

        user.last_login = Some(Utc::now());
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        info!(user_id = %user.id, "user authenticated");
        Ok(tokens)
    }

    /// Validate a bearer token and resolve its identity.
    ///
    /// Expiry is checked on the claims before any store access, so an
    /// expired token never costs a session lookup. A token whose `exp`
    /// equals the current second is already expired.
    pub async fn validate_token(&self, token: &str) -> CoreResult<AuthenticatedUser> {
        if token.is_empty() {
            return Err(CoreError::TokenInvalid);
        }
        let claims = self
            .auth
            .parse_token(token)
            .map_err(|_| CoreError::TokenInvalid)?;

        if Utc::now().timestamp() >= claims.exp {
            return Err(CoreError::TokenExpired);
        }

        let Some(session) = self.sessions.get(&claims.sid).await? else {
            return Err(CoreError::SessionNotFound);
        };
        if session.is_expired(Utc::now()) {
            return Err(CoreError::TokenExpired);
        }

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            team_id: claims.team_id,
            session_id: claims.sid,
        })
    }

    /// Exchange a refresh token for a fresh session.
    ///
    /// The old session is deleted; both the session id and the refresh token
    /// rotate.
    #[instrument(skip(self, refresh_token), err)]
    pub async fn refresh(&self, refresh_token: &str) -> CoreResult<AuthTokens> {
        if refresh_token.is_empty() {
            return Err(CoreError::InvalidInput(
                "refresh token is required".to_string(),
            ));
        }

        let Some(session) = self.sessions.get_by_refresh_token(refresh_token).await? else {
            return Err(CoreError::TokenInvalid);
        };
        if session.is_expired(Utc::now()) {
            return Err(CoreError::TokenExpired);
        }

        let Some(user) = self.users.get(&session.user_id).await? else {
            return Err(CoreError::not_found("user", session.user_id.clone()));
        };

        self.sessions.delete(&session.id).await?;
        self.create_session(&user, session.user_agent.clone(), session.ip_address.clone())
            .await
    }

    /// Invalidate the session a token points at.
    ///
    /// Unparseable tokens are a no-op: logout never fails on garbage input.
    pub async fn logout(&self, token: &str) -> CoreResult<()> {
        let Ok(claims) = self.auth.parse_token(token) else {
            return Ok(());
        };
        self.sessions.delete(&claims.sid).await?;
        info!(session_id = %claims.sid, "session terminated");
        Ok(())
    }

    /// Invalidate every session of a user.
    pub async fn logout_all(&self, user_id: &str) -> CoreResult<u64> {
        let removed = self.sessions.delete_by_user(user_id).await?;
        info!(user_id, removed, "all sessions terminated");
        Ok(removed)
    }

    /// Change a user's password and invalidate every existing session.
    #[instrument(skip(self, current_password, new_password), err)]
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> CoreResult<()> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(CoreError::InvalidInput(
                "current and new password are required".to_string(),
            ));
        }

        let Some(mut user) = self.users.get(user_id).await? else {
            return Err(CoreError::not_found("user", user_id.to_string()));
        };
        if !self
            .auth
            .verify_password(current_password, &user.password_hash)?
        {
            return Err(CoreError::InvalidCredentials);
        }

        user.password_hash = self.auth.hash_password(new_password)?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;

        self.sessions.delete_by_user(user_id).await?;
        info!(user_id, "password changed, sessions invalidated");
        Ok(())
    }

    /// Build, sign and persist a session for a verified user.
    async fn create_session(
        &self,
        user: &User,
        user_agent: Option<String>,
        ip_address: Option<String>,
    ) -> CoreResult<AuthTokens> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;
        let session_id = ids::short_id();

        let claims = TokenClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            team_id: user.team_id.clone(),
            sid: session_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = self.auth.generate_token(&claims)?;
        let refresh_token = ids::refresh_token();

        let session = Session {
            id: session_id,
            user_id: user.id.clone(),
            token: token.clone(),
            refresh_token: refresh_token.clone(),
            expires_at,
            created_at: now,
            user_agent,
            ip_address,
        };
        self.sessions.create(&session).await?;

        Ok(AuthTokens {
            token,
            refresh_token,
            expires_at,
            user: user.summary(),
        })
    }
}
