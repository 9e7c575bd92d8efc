//! Opaque refresh token generation and hashing.
//!
//! Tokens carry 512 bits of randomness, so a single fast SHA-256 is enough
//! for storage. Only the hash is persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per refresh token before encoding.
const REFRESH_TOKEN_BYTES: usize = 64;

/// Generate a cryptographically random, URL-safe refresh token.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash a refresh token for storage (lowercase hex).
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
