//! Bearer-token authentication.
//!
//! Tokens come from the external identity provider. They are verified here and
//! turned into a [`Session`](elecdocs_services::Session) for the request. A
//! request without a token proceeds anonymously; the workflows decide what an
//! anonymous caller may do.

#[cfg(feature = "jwt-jwks")]
pub mod jwks;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::Authenticator;
pub use models::{CurrentSession, JwtClaims};
