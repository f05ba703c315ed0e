// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXXXX (e.g., U_K7NP3XY2QM for users)
//!
//! Uniqueness is enforced by the storage layer; the generator only has to make
//! collisions rare.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters in a durable user id (32^10 ≈ 10^15 combinations)
const USER_ID_LENGTH: usize = 10;

/// Random characters in a token id
const TOKEN_ID_LENGTH: usize = 16;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// Durable user identity (U_)
    User,
    /// Issued token, used as the `jti` claim (K_) - K for Key
    Token,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Token => "K",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID with custom length
pub fn generate_id_with_length(prefix: EntityPrefix, length: usize) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(length))
}

/// Generate a durable user ID (U_XXXXXXXXXX)
pub fn generate_user_id() -> String {
    generate_id_with_length(EntityPrefix::User, USER_ID_LENGTH)
}

/// Generate a token ID (K_XXXXXXXXXXXXXXXX)
pub fn generate_token_id() -> String {
    generate_id_with_length(EntityPrefix::Token, TOKEN_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_format() {
        let id = generate_user_id();
        assert!(id.starts_with("U_"));
        assert_eq!(id.len(), 2 + USER_ID_LENGTH);
        assert!(id[2..]
            .bytes()
            .all(|b| CROCKFORD_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_token_ids_differ() {
        let a = generate_token_id();
        let b = generate_token_id();
        assert!(a.starts_with("K_"));
        assert_ne!(a, b);
    }
}
