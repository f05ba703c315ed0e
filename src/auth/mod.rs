//! # Auth Module
//!
//! Token lifecycle and request authorization:
//! - `codec`: signed claim encoding, the trust boundary
//! - `issuer`: access/refresh pair issuance and persistence
//! - `extractors`: the bearer-token gate (`AuthedUser`)
//! - `policy`: role and ownership checks
//! - `resolver`: password, third-party and sign-up identity resolution
//! - `store`: identity storage collaborator

pub mod codec;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod issuer;
pub mod models;
pub mod password;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod validators;


pub use extractors::{AuthContext, AuthedUser};
pub use models::{Identity, Role};
pub use routes::auth_routes;
