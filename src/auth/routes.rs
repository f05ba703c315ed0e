//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /signup` - Password sign-up
/// - `POST /login` - Password sign-in
/// - `POST /auth/refresh` - Exchange a refresh token for a new pair
/// - `GET /auth/google` - Start Google sign-in
/// - `GET /auth/google/callback` - Complete Google sign-in
pub fn auth_routes() -> Router {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/google", get(handlers::google_oauth_start))
        .route("/auth/google/callback", get(handlers::google_oauth_callback))
}
