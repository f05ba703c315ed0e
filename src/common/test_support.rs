// Shared fixtures for router-level tests

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::auth::error::AuthError;
use crate::auth::models::ThirdPartyProfile;
use crate::auth::password::fast_comparator;
use crate::auth::provider::ThirdPartyAuthProvider;
use crate::auth::store::test_support::memory_pool;
use crate::auth::store::{IdentityStore, SqliteIdentityStore};
use crate::common::config::AppConfig;
use crate::common::AppState;

pub const GOOD_CODE: &str = "good-code";

/// Provider that accepts a single authorization code
pub struct StaticProvider {
    pub profile: ThirdPartyProfile,
}

#[async_trait]
impl ThirdPartyAuthProvider for StaticProvider {
    fn authorization_url(&self) -> String {
        "https://provider.test/authorize?client_id=test".to_string()
    }

    async fn complete(&self, code: &str) -> Result<ThirdPartyProfile, AuthError> {
        if code == GOOD_CODE {
            Ok(self.profile.clone())
        } else {
            Err(AuthError::Provider("code rejected".to_string()))
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|name| match name {
        "SECRET_KEY" => Some("router-test-secret-0123456789abcdef".to_string()),
        _ => None,
    })
    .unwrap()
}

pub async fn test_state(provider: Option<Arc<dyn ThirdPartyAuthProvider>>) -> Arc<AppState> {
    let store: Arc<dyn IdentityStore> = Arc::new(SqliteIdentityStore::new(memory_pool().await));
    Arc::new(AppState::new(test_config(), store, Arc::new(fast_comparator()), provider).unwrap())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Drive one request through the router
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn signup_body(email: &str, phone: &str, role: &str) -> Value {
    serde_json::json!({
        "email": email,
        "password": "secret1",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "phone": phone,
        "user_type": role,
    })
}
