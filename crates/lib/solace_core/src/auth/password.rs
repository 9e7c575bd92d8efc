//! Password hashing via PBKDF2-HMAC-SHA256.
//!
//! Stored format is `"{salt}${hex(derived)}"` where `salt` is 32 hex chars
//! and the salt's ASCII bytes (not the decoded bytes) feed the KDF. Existing
//! stored credentials depend on both details.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::settings::MIN_KDF_ITERATIONS;

/// Random salt length before hex encoding (128 bits).
const SALT_BYTES: usize = 16;

/// Derived key length (SHA-256 output).
const DERIVED_BYTES: usize = 32;

/// Password used to build the dummy hash for unknown usernames.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing-equalisation";

/// Salted, iterated password hasher.
///
/// Holds a dummy hash computed with the same iteration count so that a login
/// for an unknown username costs one full verification, same as a wrong
/// password.
#[derive(Clone)]
pub struct PasswordHasher {
    iterations: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        let iterations = iterations.max(1);
        let dummy_hash = hash_with_salt(DUMMY_PASSWORD, &random_salt(), iterations);
        Self {
            iterations,
            dummy_hash,
        }
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        hash_with_salt(password, &random_salt(), self.iterations)
    }

    /// Verify a password against a stored hash. Malformed hashes never verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt, expected_hex)) = split_stored(stored) else {
            return false;
        };
        let derived = derive(password, salt, self.iterations);
        let actual_hex = hex::encode(derived);
        actual_hex.as_bytes().ct_eq(expected_hex.as_bytes()).into()
    }

    /// Burn one verification against the dummy hash. Result is discarded.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(MIN_KDF_ITERATIONS)
    }
}

fn random_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn derive(password: &str, salt: &str, iterations: u32) -> [u8; DERIVED_BYTES] {
    let mut out = [0u8; DERIVED_BYTES];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    out
}

fn hash_with_salt(password: &str, salt: &str, iterations: u32) -> String {
    format!("{salt}${}", hex::encode(derive(password, salt, iterations)))
}

/// Split `"{salt}${hash}"`. Exactly one `$` with non-empty halves.
fn split_stored(stored: &str) -> Option<(&str, &str)> {
    let (salt, hash) = stored.split_once('$')?;
    if salt.is_empty() || hash.is_empty() || hash.contains('$') {
        return None;
    }
    Some((salt, hash))
}
