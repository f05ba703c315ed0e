//! # Users Module
//!
//! Read access to identities behind the authentication gate:
//! - `GET /users` (ADMIN) paginated listing
//! - `GET /users/:user_id` (self or ADMIN)

pub mod handlers;
pub mod routes;


pub use routes::users_routes;
