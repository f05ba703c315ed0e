//! Credential issuance and persistence

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::codec::ClaimsCodec;
use super::error::{AuthError, TokenError};
use super::models::{AccessClaims, Identity, RefreshClaims, TokenPair, TokenUse};
use super::store::IdentityStore;
use crate::common::generate_token_id;

pub struct CredentialIssuer {
    codec: Arc<ClaimsCodec>,
    store: Arc<dyn IdentityStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl CredentialIssuer {
    pub fn new(
        codec: Arc<ClaimsCodec>,
        store: Arc<dyn IdentityStore>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec,
            store,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Sign a fresh access/refresh pair for `identity`. Pure: nothing is stored.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let now = Utc::now();

        let access = AccessClaims {
            sub: identity.user_id.clone(),
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            user_type: identity.user_type,
            token_use: TokenUse::Access,
            jti: generate_token_id(),
            iat: now.timestamp(),
            exp: expires_at(now, self.access_ttl)?,
        };
        let refresh = RefreshClaims {
            sub: identity.user_id.clone(),
            token_use: TokenUse::Refresh,
            jti: generate_token_id(),
            iat: now.timestamp(),
            exp: expires_at(now, self.refresh_ttl)?,
        };

        let pair = TokenPair {
            access_token: self.codec.encode(&access)?,
            refresh_token: self.codec.encode(&refresh)?,
        };

        debug!(
            user_id = %identity.user_id,
            access_exp = access.exp,
            refresh_exp = refresh.exp,
            "Issued token pair"
        );
        Ok(pair)
    }

    /// Overwrite the identity's stored pair and update timestamp
    pub async fn refresh_and_persist(
        &self,
        pair: &TokenPair,
        user_id: &str,
    ) -> Result<(), AuthError> {
        self.store
            .update_tokens(user_id, &pair.access_token, &pair.refresh_token, Utc::now())
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to persist issued tokens");
                AuthError::from(e)
            })?;

        info!(user_id = %user_id, "Stored latest token pair");
        Ok(())
    }

    /// Issue, persist, and mirror the new pair onto the in-memory identity
    pub async fn issue_and_persist(&self, identity: &mut Identity) -> Result<TokenPair, AuthError> {
        let pair = self.issue(identity)?;
        self.refresh_and_persist(&pair, &identity.user_id).await?;

        identity.token = Some(pair.access_token.clone());
        identity.refresh_token = Some(pair.refresh_token.clone());
        identity.updated_at = Utc::now();
        Ok(pair)
    }
}

fn expires_at(now: DateTime<Utc>, ttl: Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(ttl)
        .map(|at| at.timestamp())
        .ok_or_else(|| {
            error!(ttl_secs = ttl.num_seconds(), "Token expiry is out of range");
            TokenError::Signing("expiry out of range".to_string())
        })
}
