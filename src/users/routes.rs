// src/users/routes.rs

use axum::{routing::get, Router};

use super::handlers;

pub fn users_routes() -> Router {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/:user_id", get(handlers::get_user))
}
