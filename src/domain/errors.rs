//! Domain errors for the sercha core.

use thiserror::Error;

/// Domain-level errors surfaced by the core services.
///
/// Callers at the transport boundary map these kinds onto wire codes; inside
/// the core they are matched to drive recovery (per-change errors in the sync
/// orchestrator are counted, container errors abort the container, and so on).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    #[error("{0}")]
    InUse(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token is invalid")]
    TokenInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("session not found")]
    SessionNotFound,

    #[error("oauth provider not found: {0}")]
    OAuthProviderNotFound(String),

    #[error("oauth provider disabled: {0}")]
    OAuthProviderDisabled(String),

    #[error("oauth state is invalid or expired")]
    OAuthInvalidState,

    #[error("oauth error {code}: {description}")]
    OAuthProvider { code: String, description: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Convenience constructor for lookup misses.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Convenience constructor for uniqueness conflicts.
    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    /// Whether this error is one of the auth-validation kinds.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::TokenInvalid
                | Self::TokenExpired
                | Self::SessionNotFound
                | Self::Unauthorized(_)
        )
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Transport(err.to_string())
    }
}
