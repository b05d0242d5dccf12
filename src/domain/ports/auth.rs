//! Authentication adapter port: password hashing and token packing.
//!
//! Keeping both behind one adapter lets deployments swap the hash algorithm
//! and the token format without touching the session service.

use crate::domain::errors::CoreResult;
use crate::domain::models::TokenClaims;

pub trait AuthAdapter: Send + Sync {
    fn hash_password(&self, password: &str) -> CoreResult<String>;

    /// True when `password` matches `hash`. A malformed hash is an error,
    /// not a mismatch.
    fn verify_password(&self, password: &str, hash: &str) -> CoreResult<bool>;

    /// Sign and pack claims into a bearer token.
    fn generate_token(&self, claims: &TokenClaims) -> CoreResult<String>;

    /// Parse and verify a token's signature. Expiry is NOT enforced here;
    /// the session service applies its own convention.
    fn parse_token(&self, token: &str) -> CoreResult<TokenClaims>;
}
