// src/services/mod.rs
//
// Shared services module containing integrations and process-wide
// services used by the HTTP layer

pub mod google;
pub mod rate_limit;

// Re-export commonly used types for convenience
pub use google::GoogleService;
pub use rate_limit::RateLimitService;
