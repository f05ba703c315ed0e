// Application state shared across all modules

use std::sync::Arc;

use crate::auth::codec::ClaimsCodec;
use crate::auth::error::AuthError;
use crate::auth::issuer::CredentialIssuer;
use crate::auth::password::SecretComparator;
use crate::auth::provider::ThirdPartyAuthProvider;
use crate::auth::resolver::IdentityResolver;
use crate::auth::store::IdentityStore;
use crate::common::config::AppConfig;

/// Everything a request handler needs, built once at startup
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn IdentityStore>,
    pub codec: Arc<ClaimsCodec>,
    pub issuer: CredentialIssuer,
    pub resolver: IdentityResolver,
    /// `None` when third-party sign-in is not configured
    pub provider: Option<Arc<dyn ThirdPartyAuthProvider>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn IdentityStore>,
        comparator: Arc<dyn SecretComparator>,
        provider: Option<Arc<dyn ThirdPartyAuthProvider>>,
    ) -> Result<Self, AuthError> {
        let codec = Arc::new(ClaimsCodec::new(config.secret_key.as_bytes()));
        let issuer = CredentialIssuer::new(
            codec.clone(),
            store.clone(),
            config.access_ttl,
            config.refresh_ttl,
        );
        let resolver = IdentityResolver::new(store.clone(), comparator)?;

        Ok(Self {
            config,
            store,
            codec,
            issuer,
            resolver,
            provider,
        })
    }
}
