// src/users/handlers.rs

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::error::AuthError;
use crate::auth::policy::{require_role, require_self_or_role};
use crate::auth::{AuthedUser, Identity, Role};
use crate::common::{ApiError, AppState};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_RECORDS_PER_PAGE: i64 = 9;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub total_count: i64,
    pub user_items: Vec<Identity>,
}

/// Positive integer query parameter, or the default
fn page_param(params: &HashMap<String, String>, name: &str, default: i64) -> i64 {
    params
        .get(name)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

/// GET /users?page=&recordPerPage= - ADMIN only
pub async fn list_users(
    Extension(state): Extension<Arc<AppState>>,
    AuthedUser(caller): AuthedUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<UserPage>, ApiError> {
    require_role(&caller, Role::Admin)?;

    let page = page_param(&params, "page", DEFAULT_PAGE);
    let per_page = page_param(&params, "recordPerPage", DEFAULT_RECORDS_PER_PAGE);
    let offset = (page - 1).saturating_mul(per_page);

    let (total_count, user_items) = state
        .store
        .list(offset, per_page)
        .await
        .map_err(AuthError::from)?;

    info!(
        admin_user_id = %caller.user_id,
        page = page,
        record_per_page = per_page,
        returned = user_items.len(),
        total_count = total_count,
        "Users list fetched"
    );

    Ok(Json(UserPage {
        total_count,
        user_items,
    }))
}

/// GET /users/:user_id - the identity itself, or ADMIN
pub async fn get_user(
    Extension(state): Extension<Arc<AppState>>,
    AuthedUser(caller): AuthedUser,
    Path(user_id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    require_self_or_role(&caller, &user_id, Role::Admin)?;

    match state.store.find_by_id(&user_id).await.map_err(AuthError::from)? {
        Some(identity) => Ok(Json(identity)),
        None => {
            warn!(user_id = %user_id, "User not found");
            Err(AuthError::NotFound("user not found".to_string()).into())
        }
    }
}
