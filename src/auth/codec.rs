//! Signed token encoding: the cryptographic trust boundary

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use super::error::TokenError;
use super::models::SignedClaims;

/// HS256 codec bound to the process-wide signing key
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
}

impl std::fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &self.header.alg)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl ClaimsCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked explicitly after the signature, with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            header: Header::new(Algorithm::HS256),
            validation,
        }
    }

    pub fn encode<C>(&self, claims: &C) -> Result<String, TokenError>
    where
        C: Serialize + SignedClaims,
    {
        encode(&self.header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, token_use = %claims.token_use(), "Token signing failed");
            TokenError::Signing(e.to_string())
        })
    }

    /// Verify signature, then use, then expiry
    pub fn decode<C>(&self, token: &str) -> Result<C, TokenError>
    where
        C: DeserializeOwned + SignedClaims,
    {
        let data = decode::<C>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let failure = match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            };
            debug!(error = %e, failure = %failure, "Token rejected by codec");
            failure
        })?;

        let claims = data.claims;
        if claims.token_use() != C::USE {
            return Err(TokenError::WrongUse { expected: C::USE });
        }
        if claims.expires_at() < Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{AccessClaims, RefreshClaims, Role, TokenUse};
    use chrono::Duration;

    const SECRET: &[u8] = b"codec-test-secret-0123456789abcdef";

    fn access_claims(exp_offset: Duration) -> AccessClaims {
        let now = Utc::now();
        AccessClaims {
            sub: "U_TEST000001".to_string(),
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_type: Role::User,
            token_use: TokenUse::Access,
            jti: "K_TEST".to_string(),
            iat: now.timestamp(),
            exp: (now + exp_offset).timestamp(),
        }
    }

    #[test]
    fn test_round_trip_preserves_every_field() {
        let codec = ClaimsCodec::new(SECRET);
        let claims = access_claims(Duration::hours(1));

        let token = codec.encode(&claims).unwrap();
        let decoded: AccessClaims = codec.decode(&token).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let token = ClaimsCodec::new(SECRET)
            .encode(&access_claims(Duration::hours(1)))
            .unwrap();

        let result = ClaimsCodec::new(b"another-secret").decode::<AccessClaims>(&token);
        assert_eq!(result, Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_one_second_ago() {
        let codec = ClaimsCodec::new(SECRET);
        let token = codec.encode(&access_claims(Duration::seconds(-1))).unwrap();

        assert_eq!(codec.decode::<AccessClaims>(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = ClaimsCodec::new(SECRET);
        for garbage in ["", "not-a-token", "a.b", "a.b.c", "....."] {
            assert_eq!(
                codec.decode::<AccessClaims>(garbage),
                Err(TokenError::Malformed),
                "input {:?}",
                garbage
            );
        }
    }

    #[test]
    fn test_any_flipped_character_is_rejected() {
        let codec = ClaimsCodec::new(SECRET);
        let token = codec.encode(&access_claims(Duration::hours(1))).unwrap();

        for (idx, original) in token.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(idx..idx + 1, &replacement.to_string());

            match codec.decode::<AccessClaims>(&tampered) {
                Err(TokenError::InvalidSignature) | Err(TokenError::Malformed) => {}
                other => panic!("tampering at {} was not detected: {:?}", idx, other),
            }
        }
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let codec = ClaimsCodec::new(SECRET);
        let now = Utc::now();
        let refresh = RefreshClaims {
            sub: "U_TEST000001".to_string(),
            token_use: TokenUse::Refresh,
            jti: "K_REFRESH".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(2)).timestamp(),
        };
        let token = codec.encode(&refresh).unwrap();

        // Missing identity claims fail deserialization
        assert_eq!(
            codec.decode::<AccessClaims>(&token),
            Err(TokenError::Malformed)
        );
        assert_eq!(codec.decode::<RefreshClaims>(&token).unwrap(), refresh);
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let codec = ClaimsCodec::new(SECRET);
        let token = codec.encode(&access_claims(Duration::hours(1))).unwrap();

        assert_eq!(
            codec.decode::<RefreshClaims>(&token),
            Err(TokenError::WrongUse {
                expected: TokenUse::Refresh
            })
        );
    }

    #[test]
    fn test_empty_key_still_signs_and_verifies() {
        let codec = ClaimsCodec::new(b"");
        let claims = access_claims(Duration::hours(1));
        let token = codec.encode(&claims).unwrap();
        assert_eq!(codec.decode::<AccessClaims>(&token).unwrap(), claims);
    }
}
