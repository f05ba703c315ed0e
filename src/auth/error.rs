//! Failure taxonomy of the token lifecycle and authorization core

use std::time::Duration;
use thiserror::Error;

use super::models::TokenUse;
use super::store::StoreError;
use crate::common::ValidationResult;

/// Why a signed token was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,

    #[error("an {expected} token is required")]
    WrongUse { expected: TokenUse },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    MalformedInput(String),

    /// Shared by unknown email and wrong password
    #[error("email or password is incorrect")]
    InvalidCredential,

    #[error("refresh token is not valid for this account")]
    InvalidRefreshToken,

    #[error("{0}")]
    Conflict(String),

    #[error("No Authorization header provided")]
    MissingCredential,

    #[error("Invalid Authorization header format")]
    MalformedHeader,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("identity store did not respond within {0:?}")]
    Timeout(Duration),

    #[error("third-party sign-in failed: {0}")]
    Provider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Machine-readable code carried in error responses
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MalformedInput(_) => "MALFORMED_INPUT",
            AuthError::InvalidCredential => "INVALID_CREDENTIAL",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::Token(TokenError::InvalidSignature) => "INVALID_SIGNATURE",
            AuthError::Token(TokenError::Expired) => "EXPIRED",
            AuthError::Token(TokenError::Malformed) => "MALFORMED_TOKEN",
            AuthError::Token(TokenError::WrongUse { .. }) => "WRONG_TOKEN_USE",
            AuthError::Token(TokenError::Signing(_)) => "TOKEN_SIGNING_FAILED",
            AuthError::Forbidden(_) => "FORBIDDEN",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::StorageFailure(_) => "STORAGE_FAILURE",
            AuthError::Timeout(_) => "TIMEOUT",
            AuthError::Provider(_) => "PROVIDER_FAILURE",
            AuthError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => {
                AuthError::Conflict(format!("this {} already exists", field))
            }
            StoreError::Timeout(budget) => AuthError::Timeout(budget),
            other => AuthError::StorageFailure(other.to_string()),
        }
    }
}

impl From<ValidationResult> for AuthError {
    fn from(result: ValidationResult) -> Self {
        AuthError::MalformedInput(result.summary())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("background task failed: {}", err))
    }
}
