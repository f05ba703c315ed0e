//! Maps authentication events to durable identities

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::issuer::CredentialIssuer;
use super::models::{Identity, Role, SignupRequest, ThirdPartyProfile};
use super::password::{SecretComparator, THIRD_PARTY_SENTINEL};
use super::store::IdentityStore;
use crate::common::{
    generate_id_with_length, generate_user_id, normalize_email, safe_email_log, EntityPrefix,
    Validator,
};

pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    comparator: Arc<dyn SecretComparator>,
    /// Compared against when the email is unknown so both failure paths cost the same
    decoy_hash: String,
}

impl IdentityResolver {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        comparator: Arc<dyn SecretComparator>,
    ) -> Result<Self, AuthError> {
        let decoy_hash = comparator.hash(&generate_id_with_length(EntityPrefix::Token, 24))?;
        Ok(Self {
            store,
            comparator,
            decoy_hash,
        })
    }

    async fn compare_secret(&self, plain: &str, hashed: String) -> Result<bool, AuthError> {
        let comparator = self.comparator.clone();
        let plain = plain.to_string();
        let matched =
            tokio::task::spawn_blocking(move || comparator.compare(&plain, &hashed)).await?;
        Ok(matched)
    }

    async fn hash_secret(&self, plain: &str) -> Result<String, AuthError> {
        let comparator = self.comparator.clone();
        let plain = plain.to_string();
        tokio::task::spawn_blocking(move || comparator.hash(&plain)).await?
    }

    /// Password sign-in. Unknown email and wrong password are the same failure.
    pub async fn authenticate_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let email = normalize_email(email);
        let found = self.store.find_by_email(&email).await?;

        // Third-party identities have no password; they pay the same hash cost
        let (identity, hashed, usable) = match found {
            Some(identity) if identity.password == THIRD_PARTY_SENTINEL => {
                (Some(identity), self.decoy_hash.clone(), false)
            }
            Some(identity) => {
                let hashed = identity.password.clone();
                (Some(identity), hashed, true)
            }
            None => (None, self.decoy_hash.clone(), false),
        };

        let matched = self.compare_secret(password, hashed).await?;

        match identity {
            Some(identity) if usable && matched => {
                debug!(user_id = %identity.user_id, "Password sign-in accepted");
                Ok(identity)
            }
            _ => {
                warn!(email = %safe_email_log(&email), "Password sign-in rejected");
                Err(AuthError::InvalidCredential)
            }
        }
    }

    /// Third-party sign-in: find by email, provisioning a USER identity if absent
    pub async fn resolve_third_party(
        &self,
        profile: &ThirdPartyProfile,
    ) -> Result<Identity, AuthError> {
        let email = normalize_email(&profile.email);
        if email.is_empty() {
            return Err(AuthError::MalformedInput("Email is required".to_string()));
        }

        if let Some(existing) = self.store.find_by_email(&email).await? {
            debug!(user_id = %existing.user_id, "Third-party sign-in matched existing identity");
            return Ok(existing);
        }

        let now = Utc::now();
        let identity = Identity {
            user_id: generate_user_id(),
            email: email.clone(),
            first_name: profile.name.clone(),
            last_name: String::new(),
            phone: None,
            password: THIRD_PARTY_SENTINEL.to_string(),
            user_type: Role::User,
            avatar: profile.avatar_url.clone(),
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.create(&identity).await {
            Ok(()) => {
                info!(
                    user_id = %identity.user_id,
                    email = %safe_email_log(&email),
                    "Provisioned identity from third-party sign-in"
                );
                Ok(identity)
            }
            Err(e) => {
                // A concurrent first sign-in may have won the insert
                let err = AuthError::from(e);
                if matches!(err, AuthError::Conflict(_)) {
                    if let Some(winner) = self.store.find_by_email(&email).await? {
                        return Ok(winner);
                    }
                }
                Err(err)
            }
        }
    }

    /// Validate, pre-check uniqueness, hash, issue tokens and insert in one write.
    ///
    /// The pre-checks give a fast error; the store's unique constraint is what
    /// actually rejects a concurrent duplicate.
    pub async fn sign_up(
        &self,
        request: SignupRequest,
        issuer: &CredentialIssuer,
    ) -> Result<Identity, AuthError> {
        let validation = request.validate(&request);
        if !validation.is_valid {
            return Err(validation.into());
        }

        let email = normalize_email(request.email.as_deref().unwrap_or_default());
        let phone = request.phone.as_deref().unwrap_or_default().trim().to_string();
        let user_type = request
            .user_type
            .as_deref()
            .unwrap_or_default()
            .parse::<Role>()
            .map_err(|e| AuthError::MalformedInput(e.to_string()))?;

        if self.store.count_by_email(&email).await? > 0 {
            warn!(email = %safe_email_log(&email), "Sign-up rejected: email already exists");
            return Err(AuthError::Conflict("this email already exists".to_string()));
        }
        if self.store.count_by_phone(&phone).await? > 0 {
            warn!(email = %safe_email_log(&email), "Sign-up rejected: phone already exists");
            return Err(AuthError::Conflict(
                "this phone number already exists".to_string(),
            ));
        }

        let password = self
            .hash_secret(request.password.as_deref().unwrap_or_default())
            .await?;

        let now = Utc::now();
        let mut identity = Identity {
            user_id: generate_user_id(),
            email,
            first_name: request.first_name.unwrap_or_default().trim().to_string(),
            last_name: request.last_name.unwrap_or_default().trim().to_string(),
            phone: Some(phone),
            password,
            user_type,
            avatar: None,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let pair = issuer.issue(&identity)?;
        identity.token = Some(pair.access_token);
        identity.refresh_token = Some(pair.refresh_token);

        self.store.create(&identity).await?;

        info!(
            user_id = %identity.user_id,
            email = %safe_email_log(&identity.email),
            user_type = %identity.user_type,
            "Created identity via sign-up"
        );
        Ok(identity)
    }
}
