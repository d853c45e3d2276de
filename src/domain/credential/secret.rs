//! Secret generation, hashing and comparison

use std::fmt;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::validation::require_non_empty;
use crate::domain::DomainError;

/// One-time plaintext secret.
///
/// Only held by an instance returned from creation or rotation. Debug and
/// Display output is redacted, and the type has no `Serialize` impl so it
/// cannot end up in a stored record.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextSecret {
    inner: String,
}

impl PlaintextSecret {
    /// Use the caller's text (trimmed, non-empty) or generate a fresh one
    pub fn resolve(text: Option<&str>) -> Result<Self, DomainError> {
        let inner = match text {
            Some(text) => require_non_empty("secret", text)?,
            None => generate_identifier(),
        };

        Ok(Self { inner })
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Hex SHA-256 of the secret, the only form that is ever persisted
    pub fn hash(&self) -> String {
        hash_secret(&self.inner)
    }
}

impl fmt::Debug for PlaintextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaintextSecret([REDACTED])")
    }
}

impl fmt::Display for PlaintextSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Fresh random v4 UUID, used for both ids and generated secrets
pub fn generate_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercase hex SHA-256 digest of `text`
pub fn hash_secret(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash `candidate` and compare it with `stored_hash` in constant time
pub fn verify_secret(candidate: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_secret(candidate), stored_hash)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
