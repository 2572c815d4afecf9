use std::num::NonZeroU32;

use pbkdf2::{
    Params, Pbkdf2,
    password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use rand::Rng;
use thiserror::Error;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("malformed password hash")]
    Malformed,
    #[error("password hashing failed: {0}")]
    Hashing(password_hash::Error),
}

/// PBKDF2-HMAC-SHA256 with a random per-password salt, stored as a PHC string
/// (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).
///
/// Verification reads the round count from the stored string, so raising
/// `rounds` does not invalidate existing accounts.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    rounds: NonZeroU32,
}

impl PasswordHasher {
    #[must_use]
    pub fn new(rounds: NonZeroU32) -> Self {
        Self { rounds }
    }

    /// # Errors
    /// Returns [`PasswordError::Hashing`] if the PHC string cannot be built.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        let salt = SaltString::encode_b64(&salt).map_err(PasswordError::Hashing)?;
        let params = Params {
            rounds: self.rounds.get(),
            output_length: HASH_LEN,
        };

        let hash = Pbkdf2
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map_err(PasswordError::Hashing)?;
        Ok(hash.to_string())
    }

    /// # Errors
    /// Returns [`PasswordError::Malformed`] when `encoded` is not a PBKDF2 PHC string.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(encoded).map_err(|_| PasswordError::Malformed)?;
        match Pbkdf2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::Malformed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(NonZeroU32::new(1_000).expect("non-zero"))
    }

    #[test]
    fn hash_verifies_original_password_only() {
        let hasher = hasher();
        let encoded = hasher.hash("correct horse").expect("hashes");

        assert!(encoded.starts_with("$pbkdf2-sha256$"), "{encoded}");
        assert!(encoded.contains("i=1000"), "{encoded}");
        assert_eq!(hasher.verify("correct horse", &encoded), Ok(true));
        assert_eq!(hasher.verify("battery staple", &encoded), Ok(false));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = hasher();
        assert_ne!(
            hasher.hash("same").expect("hashes"),
            hasher.hash("same").expect("hashes")
        );
    }

    #[test]
    fn verify_uses_rounds_from_encoded_hash() {
        let old = PasswordHasher::new(NonZeroU32::new(500).expect("non-zero"))
            .hash("secret1")
            .expect("hashes");

        assert_eq!(hasher().verify("secret1", &old), Ok(true));
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let hasher = hasher();
        for encoded in [
            "",
            "plain-text",
            "pbkdf2-sha256$1000$AAAA$AAAA",
            "$bcrypt$i=10$c2FsdHNhbHQ$aGFzaGhhc2g",
            "$pbkdf2-sha256$i=abc$c2FsdHNhbHQ$aGFzaGhhc2g",
        ] {
            assert_eq!(
                hasher.verify("pw", encoded),
                Err(PasswordError::Malformed),
                "{encoded}"
            );
        }
    }
}
