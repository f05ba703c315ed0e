// Error handling types for the API

use axum::{
    extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json,
};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::auth::error::{AuthError, TokenError};

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized { message: String, code: &'static str },
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServer { message: String, code: &'static str },
    ServiceUnavailable(String),
    BadGateway(String),
    GatewayTimeout(String),
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::InternalServer {
            message: message.into(),
            code: "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalServer { message, .. } => {
                write!(f, "Internal Server Error: {}", message)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad Gateway: {}", msg),
            ApiError::GatewayTimeout(msg) => write!(f, "Gateway Timeout: {}", msg),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (error_message, code) = match self {
            ApiError::Unauthorized { message, code } => (message, code),
            ApiError::Forbidden(msg) => (msg, "FORBIDDEN"),
            ApiError::BadRequest(msg) => (msg, "MALFORMED_INPUT"),
            ApiError::NotFound(msg) => (msg, "NOT_FOUND"),
            ApiError::Conflict(msg) => (msg, "CONFLICT"),
            ApiError::InternalServer { message, code } => (message, code),
            ApiError::ServiceUnavailable(msg) => (msg, "SERVICE_UNAVAILABLE"),
            ApiError::BadGateway(msg) => (msg, "PROVIDER_FAILURE"),
            ApiError::GatewayTimeout(msg) => (msg, "TIMEOUT"),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = err.code();
        match err {
            AuthError::MalformedInput(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidCredential
            | AuthError::InvalidRefreshToken
            | AuthError::MissingCredential
            | AuthError::MalformedHeader
            | AuthError::Token(TokenError::InvalidSignature)
            | AuthError::Token(TokenError::Expired)
            | AuthError::Token(TokenError::Malformed)
            | AuthError::Token(TokenError::WrongUse { .. }) => ApiError::Unauthorized {
                message: err.to_string(),
                code,
            },
            AuthError::Token(TokenError::Signing(ref detail)) => {
                error!(error = %detail, "Token signing failed");
                ApiError::InternalServer {
                    message: "Failed to issue credentials".to_string(),
                    code,
                }
            }
            AuthError::Conflict(msg) => ApiError::Conflict(msg),
            AuthError::Forbidden(msg) => ApiError::Forbidden(msg),
            AuthError::NotFound(msg) => ApiError::NotFound(msg),
            AuthError::StorageFailure(ref detail) => {
                error!(error = %detail, "Storage error occurred");
                ApiError::InternalServer {
                    message: "Storage operation failed".to_string(),
                    code,
                }
            }
            AuthError::Timeout(_) => {
                error!(error = %err, "Request exceeded its storage budget");
                ApiError::GatewayTimeout("Storage did not respond in time".to_string())
            }
            AuthError::Provider(ref detail) => {
                error!(error = %detail, "Identity provider failure");
                ApiError::BadGateway("Third-party sign-in failed".to_string())
            }
            AuthError::Internal(ref detail) => {
                error!(error = %detail, "Internal error occurred");
                ApiError::internal("Internal server error")
            }
        }
    }
}

/// Body that is not JSON, or does not match the expected shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
