// src/services/google.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::auth::error::AuthError;
use crate::auth::models::ThirdPartyProfile;
use crate::auth::provider::ThirdPartyAuthProvider;
use crate::common::config::GoogleOAuthConfig;
use crate::common::safe_email_log;

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Google account has no verified email")]
    MissingEmail,
}

impl From<GoogleError> for AuthError {
    fn from(err: GoogleError) -> Self {
        AuthError::Provider(err.to_string())
    }
}

/// Only the access token is needed to read the profile
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
    verified_email: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleService {
    config: GoogleOAuthConfig,
    client: Client,
}

impl GoogleService {
    pub fn new(config: GoogleOAuthConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Get authorization URL for the sign-in flow
    pub fn get_authorization_url(&self) -> String {
        let scope_param = ["openid", "email", "profile"].join(" ");

        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&prompt=select_account",
            AUTHORIZATION_ENDPOINT,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.callback_url),
            urlencoding::encode(&scope_param)
        );

        debug!("Generated Google OAuth authorization URL with scopes: {}", scope_param);
        auth_url
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, GoogleError> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.callback_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Token exchange failed");
            return Err(GoogleError::OAuthFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))
    }

    /// Fetch the signed-in account's profile
    pub async fn get_profile(&self, access_token: &str) -> Result<ThirdPartyProfile, GoogleError> {
        let response = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GoogleError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GoogleError::RequestFailed(format!(
                "Failed to get user info: HTTP {}",
                response.status()
            )));
        }

        let user_info = response
            .json::<UserInfo>()
            .await
            .map_err(|e| GoogleError::SerializationError(e.to_string()))?;

        profile_from_user_info(user_info)
    }
}

fn profile_from_user_info(info: UserInfo) -> Result<ThirdPartyProfile, GoogleError> {
    let email = match (info.email, info.verified_email) {
        (Some(email), Some(true) | None) if !email.trim().is_empty() => email,
        _ => return Err(GoogleError::MissingEmail),
    };

    Ok(ThirdPartyProfile {
        name: info.name.unwrap_or_default(),
        avatar_url: info.picture.filter(|p| !p.is_empty()),
        email,
    })
}

#[async_trait]
impl ThirdPartyAuthProvider for GoogleService {
    fn authorization_url(&self) -> String {
        self.get_authorization_url()
    }

    async fn complete(&self, code: &str) -> Result<ThirdPartyProfile, AuthError> {
        let tokens = self.exchange_code(code).await?;
        let profile = self.get_profile(&tokens.access_token).await?;
        info!(
            email = %safe_email_log(&profile.email),
            "Completed Google sign-in handshake"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> GoogleService {
        GoogleService::new(GoogleOAuthConfig {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            callback_url: "http://localhost:8000/auth/google/callback".to_string(),
        })
    }

    #[test]
    fn test_get_authorization_url() {
        let auth_url = service().authorization_url();

        assert!(auth_url.starts_with(AUTHORIZATION_ENDPOINT));
        assert!(auth_url.contains("client_id=test_client_id"));
        assert!(auth_url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(auth_url.contains("scope=openid%20email%20profile"));
        assert!(!auth_url.contains("test_secret"));
    }

    #[test]
    fn test_profile_requires_verified_email() {
        let unverified = UserInfo {
            email: Some("a@x.com".to_string()),
            verified_email: Some(false),
            name: Some("A".to_string()),
            picture: None,
        };
        assert!(matches!(
            profile_from_user_info(unverified),
            Err(GoogleError::MissingEmail)
        ));

        let verified = UserInfo {
            email: Some("a@x.com".to_string()),
            verified_email: Some(true),
            name: Some("A Person".to_string()),
            picture: Some("https://example.com/a.png".to_string()),
        };
        let profile = profile_from_user_info(verified).unwrap();
        assert_eq!(profile.email, "a@x.com");
        assert_eq!(profile.name, "A Person");
        assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn test_google_errors_become_provider_failures() {
        let err: AuthError = GoogleError::OAuthFailed("HTTP 400".to_string()).into();
        assert!(matches!(err, AuthError::Provider(_)));
    }
}
