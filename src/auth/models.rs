//! Authentication data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of roles an identity can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}', expected ADMIN or USER", self.0)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Durable user record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Opaque password hash, or the third-party sentinel
    #[serde(skip_serializing)]
    pub password: String,
    pub user_type: Role,
    pub avatar: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which half of a token pair a signed token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenUse::Access => f.write_str("access"),
            TokenUse::Refresh => f.write_str("refresh"),
        }
    }
}

/// Claims signed into an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Durable user id
    pub sub: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: Role,
    pub token_use: TokenUse,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims signed into a refresh token: durable id only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub token_use: TokenUse,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Implemented by every claim set the codec signs
pub trait SignedClaims {
    /// The token use a decoded token of this type must carry
    const USE: TokenUse;

    fn token_use(&self) -> TokenUse;

    /// Expiry instant, seconds since the Unix epoch
    fn expires_at(&self) -> i64;
}

impl SignedClaims for AccessClaims {
    const USE: TokenUse = TokenUse::Access;

    fn token_use(&self) -> TokenUse {
        self.token_use
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl SignedClaims for RefreshClaims {
    const USE: TokenUse = TokenUse::Refresh;

    fn token_use(&self) -> TokenUse {
        self.token_use
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Verified profile handed over by a third-party identity provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThirdPartyProfile {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// POST /signup body; every field optional so missing ones are reported together
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}
