//! Seam between the identity resolver and an external identity provider

use async_trait::async_trait;

use super::error::AuthError;
use super::models::ThirdPartyProfile;

/// Opaque provider handshake yielding an already-verified profile
#[async_trait]
pub trait ThirdPartyAuthProvider: Send + Sync {
    /// Where to send the browser to start the handshake
    fn authorization_url(&self) -> String;

    /// Finish the handshake for the authorization `code` handed back to the callback
    async fn complete(&self, code: &str) -> Result<ThirdPartyProfile, AuthError>;
}
