//! One-way password hashing and comparison

use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use password_hash::{PasswordHash, SaltString};
use rand::RngCore;

use super::error::AuthError;
use crate::common::config::PasswordHashConfig;

/// Stored in place of a hash for identities that can only sign in through a
/// third party. Not a PHC string, so it never verifies.
pub const THIRD_PARTY_SENTINEL: &str = "!third-party-sign-in";

/// Deliberately slow one-way comparison; callers run it off the async executor
pub trait SecretComparator: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, AuthError>;

    /// Constant-time comparison of `plain` against a stored hash
    fn compare(&self, plain: &str, hashed: &str) -> bool;
}

pub struct Argon2Comparator {
    params: Params,
}

impl Argon2Comparator {
    pub fn new(config: &PasswordHashConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::Internal(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl SecretComparator for Argon2Comparator {
    fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::Internal(format!("salt encoding failed: {}", e)))?;

        let phc = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))?
            .to_string();
        Ok(phc)
    }

    fn compare(&self, plain: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            // Parameters embedded in the PHC string take precedence
            Ok(parsed) => self
                .argon2()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_comparator() -> Argon2Comparator {
    Argon2Comparator::new(&PasswordHashConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
