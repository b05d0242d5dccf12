//! User and session domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids;

/// Role of a user within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Member,
    Viewer,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

/// An account that can authenticate.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Stored lowercased and trimmed; unique per team.
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub team_id: String,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: impl Into<String>, team_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ids::short_id(),
            email: normalize_email(email),
            password_hash: String::new(),
            name: name.into(),
            role: UserRole::default(),
            team_id: team_id.into(),
            active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            team_id: self.team_id.clone(),
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("team_id", &self.team_id)
            .field("active", &self.active)
            .finish()
    }
}

/// Canonical email form: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The non-sensitive slice of a user returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub team_id: String,
}

/// An authenticated bearer session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque id, also carried as the token's `sid` claim.
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl Session {
    /// Expired sessions are invalid regardless of store presence.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Claims packed into a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub team_id: String,
    /// Session id.
    pub sid: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Result of a successful authentication or refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// The identity attached to a validated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub role: UserRole,
    pub team_id: String,
    pub session_id: String,
}
