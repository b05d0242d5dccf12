//! Identifier and token material generation.
//!
//! All opaque identifiers in the system share one format: 16 random bytes,
//! base64url without padding. Refresh tokens are twice as long. OAuth state
//! and PKCE verifiers are hex-encoded and truncated to fixed widths so they
//! survive every provider's query-string handling.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a short opaque identifier: 16 random bytes, base64url unpadded.
pub fn short_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a refresh token: 32 random bytes, base64url unpadded.
pub fn refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a hex token from `len` random bytes, truncated to `len`
/// characters.
///
/// Used for OAuth `state` (32 chars) and PKCE `code_verifier` (64 chars).
pub fn hex_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let mut token = hex::encode(bytes);
    token.truncate(len);
    token
}

/// Compute the PKCE code challenge: `base64url_no_pad(sha256(verifier))`.
pub fn pkce_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
