//! Authentication handlers

use axum::extract::{rejection::JsonRejection, Extension, Json, Query};
use axum::response::Redirect;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::error::AuthError;
use super::models::{
    Identity, LoginRequest, RefreshClaims, RefreshRequest, SignupRequest, TokenPair,
};
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

/// POST /signup
/// Creates a password identity and returns it with a fresh token pair
///
/// # Request Body
/// ```json
/// {
///   "email": "a@x.com",
///   "password": "secret1",
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "phone": "555-0100",
///   "user_type": "USER"
/// }
/// ```
pub async fn signup(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<Identity>, ApiError> {
    let Json(request) = payload?;
    info!("🔐 Received sign-up request");

    let identity = state.resolver.sign_up(request, &state.issuer).await?;
    Ok(Json(identity))
}

/// POST /login
/// Password sign-in; every successful login issues and stores a new pair
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Identity>, ApiError> {
    let Json(request) = payload?;
    debug!(email = %safe_email_log(&request.email), "Received login request");

    let mut identity = state
        .resolver
        .authenticate_password(&request.email, &request.password)
        .await?;
    state.issuer.issue_and_persist(&mut identity).await?;

    info!(
        user_id = %identity.user_id,
        email = %safe_email_log(&identity.email),
        "User logged in"
    );
    Ok(Json(identity))
}

/// POST /auth/refresh
/// Exchanges the identity's current refresh token for a new pair.
/// The presented token must be the one most recently stored, so each
/// refresh token is good for one exchange.
pub async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<Identity>, ApiError> {
    let Json(request) = payload?;

    let claims: RefreshClaims = state
        .codec
        .decode(&request.refresh_token)
        .map_err(AuthError::from)?;

    let mut identity = match state.store.find_by_id(&claims.sub).await.map_err(AuthError::from)? {
        Some(identity) => identity,
        None => {
            warn!(user_id = %claims.sub, "Refresh rejected: identity no longer exists");
            return Err(AuthError::InvalidRefreshToken.into());
        }
    };

    if identity.refresh_token.as_deref() != Some(request.refresh_token.as_str()) {
        warn!(
            user_id = %identity.user_id,
            presented = %safe_token_log(&request.refresh_token),
            "Refresh rejected: token is not the latest issued"
        );
        return Err(AuthError::InvalidRefreshToken.into());
    }

    state.issuer.issue_and_persist(&mut identity).await?;
    info!(user_id = %identity.user_id, "Rotated token pair");
    Ok(Json(identity))
}

/// GET /auth/google - Start the Google sign-in flow
pub async fn google_oauth_start(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Redirect, ApiError> {
    let provider = state.provider.as_ref().ok_or_else(|| {
        warn!("Google sign-in requested but not configured");
        ApiError::ServiceUnavailable("Google sign-in is not configured".to_string())
    })?;

    info!("Starting Google OAuth flow");
    Ok(Redirect::to(&provider.authorization_url()))
}

/// GET /auth/google/callback - Complete the Google sign-in flow
///
/// On success the browser is sent to the frontend callback with the profile in
/// the query string and the token pair in the fragment. Any failure sends it
/// to the sign-up page instead.
pub async fn google_oauth_callback(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, ApiError> {
    let provider = state.provider.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Google sign-in is not configured".to_string())
    })?;

    let failure = || {
        Redirect::to(&format!(
            "{}?error=google_auth_failed",
            state.config.frontend_signup_url
        ))
    };

    if let Some(oauth_error) = params.get("error") {
        warn!(oauth_error = %oauth_error, "Google OAuth returned error");
        return Ok(failure());
    }

    let code = match params.get("code").filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => {
            warn!("No authorization code in OAuth callback");
            return Ok(failure());
        }
    };

    let outcome = async {
        let profile = provider.complete(code).await?;
        let mut identity = state.resolver.resolve_third_party(&profile).await?;
        let pair = state.issuer.issue_and_persist(&mut identity).await?;
        Ok::<_, AuthError>((identity, pair))
    }
    .await;

    match outcome {
        Ok((identity, pair)) => {
            info!(
                user_id = %identity.user_id,
                email = %safe_email_log(&identity.email),
                "Google sign-in completed"
            );
            Ok(Redirect::to(&frontend_callback_url(
                &state.config.frontend_callback_url,
                &identity,
                &pair,
            )))
        }
        Err(e) => {
            error!(error = %e, "Google sign-in failed");
            Ok(failure())
        }
    }
}

/// Profile travels in the query; tokens in the fragment, which browsers do not send to servers
fn frontend_callback_url(base: &str, identity: &Identity, pair: &TokenPair) -> String {
    let name = format!("{} {}", identity.first_name, identity.last_name);
    format!(
        "{}?email={}&name={}&picture={}&provider=google#access_token={}&refresh_token={}",
        base,
        urlencoding::encode(&identity.email),
        urlencoding::encode(name.trim()),
        urlencoding::encode(identity.avatar.as_deref().unwrap_or_default()),
        urlencoding::encode(&pair.access_token),
        urlencoding::encode(&pair.refresh_token),
    )
}
