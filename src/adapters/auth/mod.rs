//! Default authentication adapter: argon2 password hashes and HS256 tokens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::TokenClaims;
use crate::domain::ports::AuthAdapter;

/// Argon2id hashing plus HMAC-SHA256 JWTs.
pub struct DefaultAuthAdapter {
    secret: Vec<u8>,
}

impl DefaultAuthAdapter {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl AuthAdapter for DefaultAuthAdapter {
    fn hash_password(&self, password: &str) -> CoreResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| CoreError::Serialization(format!("password hashing failed: {err}")))
    }

    fn verify_password(&self, password: &str, hash: &str) -> CoreResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|err| CoreError::Serialization(format!("malformed password hash: {err}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn generate_token(&self, claims: &TokenClaims) -> CoreResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|err| CoreError::Serialization(format!("token signing failed: {err}")))
    }

    fn parse_token(&self, token: &str) -> CoreResult<TokenClaims> {
        // Expiry enforcement lives in the session service, which applies its
        // own boundary convention; here only the signature is checked.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| CoreError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::UserRole;
    use chrono::Utc;

    fn adapter() -> DefaultAuthAdapter {
        DefaultAuthAdapter::new(b"test-secret".to_vec())
    }

    fn claims(exp_offset: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: "u1".to_string(),
            email: "a@b.c".to_string(),
            role: UserRole::Admin,
            team_id: "team".to_string(),
            sid: "s1".to_string(),
            iat: now,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_password_round_trip() {
        let auth = adapter();
        let hash = auth.hash_password("hunter2!").unwrap();
        assert_ne!(hash, "hunter2!");
        assert!(auth.verify_password("hunter2!", &hash).unwrap());
        assert!(!auth.verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let auth = adapter();
        let first = auth.hash_password("same").unwrap();
        let second = auth.hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error_not_a_mismatch() {
        let auth = adapter();
        assert!(auth.verify_password("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        let auth = adapter();
        let claims = claims(3600);
        let token = auth.generate_token(&claims).unwrap();
        let parsed = auth.parse_token(&token).unwrap();
        assert_eq!(parsed, claims);
    }

    #[test]
    fn test_expired_token_still_parses() {
        // The adapter only verifies the signature; expiry is policy above it.
        let auth = adapter();
        let token = auth.generate_token(&claims(-3600)).unwrap();
        assert!(auth.parse_token(&token).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let auth = adapter();
        let token = auth.generate_token(&claims(3600)).unwrap();
        let other = DefaultAuthAdapter::new(b"different-secret".to_vec());
        assert!(matches!(
            other.parse_token(&token).unwrap_err(),
            CoreError::TokenInvalid
        ));
    }
}
