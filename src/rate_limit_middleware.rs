// rate_limit_middleware.rs
use crate::services::rate_limit::{RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize)]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u32,
}

/// Extract IP address from request.
///
/// Forwarding headers are client-controlled unless a trusted proxy sets them,
/// so they are only read when `trust_proxy_headers` is on.
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> Option<String> {
    if !trust_proxy_headers {
        return connect_info.map(|info| info.0.ip().to_string());
    }

    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    // Fall back to connection info
    connect_info.map(|info| info.0.ip().to_string())
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_key = extract_ip_address(
        request.headers(),
        connect_info.as_ref(),
        rate_limit_service.config().trust_proxy_headers,
    )
    .unwrap_or_else(|| "unknown".to_string());

    let path = request.uri().path().to_string();

    match rate_limit_service.check_rate_limit(&client_key).await {
        RateLimitResult::Allowed => {
            debug!(
                client = %client_key,
                path = %path,
                "Request allowed by rate limiter"
            );
            Ok(next.run(request).await)
        }
        RateLimitResult::Limited { retry_after } => {
            warn!(
                client = %client_key,
                path = %path,
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );

            rate_limit_service.log_violation(&client_key, &path);

            let error_response = RateLimitErrorResponse {
                error: "Rate limit exceeded. Please try again later.".to_string(),
                code: "RATE_LIMIT_EXCEEDED".to_string(),
                retry_after,
            };

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

            if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", retry_header);
            }

            let limit = rate_limit_service.config().requests_per_window.to_string();
            if let Ok(limit_header) = HeaderValue::from_str(&limit) {
                response
                    .headers_mut()
                    .insert("x-ratelimit-limit", limit_header);
            }

            Err(response)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rate_limit::RateLimitConfig;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        let ip = extract_ip_address(&headers, None, true);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        let ip = extract_ip_address(&headers, None, true);
        assert_eq!(ip, Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_connect_info() {
        let headers = HeaderMap::new();
        let info = ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 4242)));

        let ip = extract_ip_address(&headers, Some(&info), false);
        assert_eq!(ip, Some("198.51.100.7".to_string()));
    }

    #[test]
    fn test_forwarding_headers_ignored_unless_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
        headers.insert("x-real-ip", "203.0.113.2".parse().unwrap());
        let info = ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 4242)));

        let ip = extract_ip_address(&headers, Some(&info), false);
        assert_eq!(ip, Some("198.51.100.7".to_string()));
    }

    fn limited_app(trust_proxy_headers: bool) -> Router {
        let service = Arc::new(RateLimitService::with_config(RateLimitConfig {
            enabled: true,
            requests_per_window: 1,
            window_seconds: 60,
            whitelist_ips: Vec::new(),
            trust_proxy_headers,
        }));
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(rate_limit_middleware))
            .layer(Extension(service))
    }

    fn request_from(peer: [u8; 4], forwarded_for: &str) -> HttpRequest<Body> {
        let mut request = HttpRequest::builder()
            .uri("/")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 4242))));
        request
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_reset_budget() {
        let app = limited_app(false);

        let first = app
            .clone()
            .oneshot(request_from([198, 51, 100, 7], "203.0.113.1"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(request_from([198, 51, 100, 7], "203.0.113.2"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_over_limit_returns_429_with_retry_after() {
        let app = limited_app(true);

        let first = app
            .clone()
            .oneshot(request_from([198, 51, 100, 7], "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // Behind a trusted proxy the forwarded client is the key, not the peer
        let second = app
            .oneshot(request_from([198, 51, 100, 8], "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key("retry-after"));
    }
}
