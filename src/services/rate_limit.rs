// src/services/rate_limit.rs
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_seconds: u32,
    pub whitelist_ips: Vec<String>,
    /// Key on X-Forwarded-For / X-Real-IP; only safe behind a proxy that sets them
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 60, // 60 requests per minute per client
            window_seconds: 60,
            whitelist_ips: Vec::new(),
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable rate limiting
        if let Some(enabled) = lookup("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        // RATE_LIMIT_REQUESTS - requests per window per client
        if let Some(limit) = lookup("RATE_LIMIT_REQUESTS") {
            match limit.parse::<u32>() {
                Ok(val) if val > 0 => config.requests_per_window = val,
                _ => warn!(value = %limit, "Ignoring invalid RATE_LIMIT_REQUESTS"),
            }
        }

        // RATE_LIMIT_WINDOW_SECONDS - time window in seconds
        if let Some(window) = lookup("RATE_LIMIT_WINDOW_SECONDS") {
            match window.parse::<u32>() {
                Ok(val) if val > 0 => config.window_seconds = val,
                _ => warn!(value = %window, "Ignoring invalid RATE_LIMIT_WINDOW_SECONDS"),
            }
        }

        // RATE_LIMIT_WHITELIST_IPS - comma-separated list of whitelisted IPs
        if let Some(whitelist) = lookup("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // RATE_LIMIT_TRUST_PROXY - set to "true" when deployed behind a reverse proxy
        if let Some(trust) = lookup("RATE_LIMIT_TRUST_PROXY") {
            config.trust_proxy_headers = trust.eq_ignore_ascii_case("true");
        }

        config
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds as u64)
    }
}

#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }

    fn is_expired(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() >= window_duration
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u32 },
}

/// Fixed-window request counter shared by every request task
#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    rate_limiter: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl RateLimitService {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            requests_per_window = config.requests_per_window,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            "Initializing RateLimitService"
        );
        Self {
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if an IP is whitelisted
    fn is_whitelisted(&self, ip: &str) -> bool {
        self.config.whitelist_ips.iter().any(|whitelisted_ip| whitelisted_ip == ip)
    }

    /// Count one request from `client_key` and decide whether it may proceed
    pub async fn check_rate_limit(&self, client_key: &str) -> RateLimitResult {
        if !self.config.enabled || self.is_whitelisted(client_key) {
            return RateLimitResult::Allowed;
        }

        let window_duration = self.config.window();
        let mut limiter = self.rate_limiter.write().await;

        let state = limiter
            .entry(format!("ip:{}", client_key))
            .or_insert_with(RateLimitState::new);

        if state.is_expired(window_duration) {
            state.reset();
        }

        if state.count >= self.config.requests_per_window {
            let elapsed = state.window_start.elapsed().as_secs() as u32;
            let retry_after = self.config.window_seconds.saturating_sub(elapsed).max(1);
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        RateLimitResult::Allowed
    }

    /// Log a rate limit violation
    pub fn log_violation(&self, client_key: &str, endpoint: &str) {
        warn!(
            client = %client_key,
            endpoint = %endpoint,
            "Rate limit violation detected"
        );
    }

    /// Drop counters whose window has passed
    pub async fn cleanup_expired(&self) -> usize {
        let window_duration = self.config.window();
        let mut limiter = self.rate_limiter.write().await;
        let before = limiter.len();
        limiter.retain(|_, state| !state.is_expired(window_duration));
        let removed = before - limiter.len();
        debug!(
            removed = removed,
            remaining = limiter.len(),
            "Cleaned up expired rate limit entries"
        );
        removed
    }

    /// Periodically purge expired windows for the life of the process
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.window());
            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(limit: u32, window_seconds: u32) -> RateLimitService {
        RateLimitService::with_config(RateLimitConfig {
            enabled: true,
            requests_per_window: limit,
            window_seconds,
            whitelist_ips: vec!["10.0.0.1".to_string()],
            trust_proxy_headers: false,
        })
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_when_exceeded() {
        let service = service(3, 60);

        for _ in 0..3 {
            assert_eq!(
                service.check_rate_limit("192.168.1.1").await,
                RateLimitResult::Allowed
            );
        }

        match service.check_rate_limit("192.168.1.1").await {
            RateLimitResult::Limited { retry_after } => {
                assert!(retry_after >= 1 && retry_after <= 60)
            }
            other => panic!("expected limit, got {:?}", other),
        }

        // Other clients have their own window
        assert_eq!(
            service.check_rate_limit("192.168.1.2").await,
            RateLimitResult::Allowed
        );
    }

    #[tokio::test]
    async fn test_whitelisted_and_disabled() {
        let service = service(1, 60);
        for _ in 0..5 {
            assert_eq!(
                service.check_rate_limit("10.0.0.1").await,
                RateLimitResult::Allowed
            );
        }

        let disabled = RateLimitService::with_config(RateLimitConfig {
            enabled: false,
            requests_per_window: 1,
            ..RateLimitConfig::default()
        });
        for _ in 0..5 {
            assert_eq!(
                disabled.check_rate_limit("192.168.1.1").await,
                RateLimitResult::Allowed
            );
        }
    }

    #[tokio::test]
    async fn test_window_expiry_resets_and_cleans_up() {
        let service = service(1, 1);
        assert_eq!(service.check_rate_limit("192.168.1.1").await, RateLimitResult::Allowed);
        assert!(matches!(
            service.check_rate_limit("192.168.1.1").await,
            RateLimitResult::Limited { .. }
        ));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(service.cleanup_expired().await, 1);
        assert_eq!(service.check_rate_limit("192.168.1.1").await, RateLimitResult::Allowed);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = RateLimitConfig::from_lookup(|name| match name {
            "RATE_LIMIT_ENABLED" => Some("false".to_string()),
            "RATE_LIMIT_REQUESTS" => Some("0".to_string()),
            "RATE_LIMIT_WHITELIST_IPS" => Some("127.0.0.1, ::1".to_string()),
            _ => None,
        });
        assert!(!config.enabled);
        assert_eq!(config.requests_per_window, 60);
        assert_eq!(config.whitelist_ips, vec!["127.0.0.1", "::1"]);
        assert!(!config.trust_proxy_headers);

        let proxied = RateLimitConfig::from_lookup(|name| match name {
            "RATE_LIMIT_TRUST_PROXY" => Some("TRUE".to_string()),
            _ => None,
        });
        assert!(proxied.trust_proxy_headers);
    }
}
