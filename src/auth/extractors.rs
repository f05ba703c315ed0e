//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::codec::ClaimsCodec;
use super::error::AuthError;
use super::models::{AccessClaims, Role};
use crate::common::{safe_email_log, ApiError, AppState};

/// Identity bound to a request once its bearer token has been accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<AccessClaims> for AuthContext {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            first_name: claims.first_name,
            last_name: claims.last_name,
            role: claims.user_type,
        }
    }
}

/// Validate an `Authorization` header value.
///
/// The value must be exactly `<scheme> <token>` with the scheme matching
/// `bearer` in any case. Only access tokens are accepted.
pub fn authenticate_header(
    header: Option<&str>,
    codec: &ClaimsCodec,
) -> Result<AuthContext, AuthError> {
    let header = match header {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(AuthError::MissingCredential),
    };

    let parts: Vec<&str> = header.split_whitespace().collect();
    let token = match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => *token,
        _ => return Err(AuthError::MalformedHeader),
    };

    let claims: AccessClaims = codec.decode(token)?;
    Ok(claims.into())
}

/// Authenticated user extractor
///
/// Rejects the request with 401 unless it carries a valid access token. The
/// resulting context is cached in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(AuthedUser(context.clone()));
        }

        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::internal("missing app state"))?;

        // A header value that is not visible ASCII cannot be a bearer credential
        let header = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| {
                warn!("Authentication failed: Authorization header is not valid text");
                ApiError::from(AuthError::MalformedHeader)
            })?),
        };

        let context = authenticate_header(header, &app_state.codec).map_err(|e| {
            warn!(
                path = %parts.uri.path(),
                reason = %e,
                "Authentication failed"
            );
            ApiError::from(e)
        })?;

        debug!(
            user_id = %context.user_id,
            email = %safe_email_log(&context.email),
            role = %context.role,
            "User authentication successful via extractor"
        );

        parts.extensions.insert(context.clone());
        Ok(AuthedUser(context))
    }
}
