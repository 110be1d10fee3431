use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use elecdocs_core::Identity;
use elecdocs_services::Session;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Claims read from identity provider tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Provider user id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl JwtClaims {
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone(), self.email.clone())
    }
}

/// Session resolved by the auth middleware for the current request.
///
/// Falls back to an anonymous session when the middleware did not run, so the
/// extractor never rejects and works alongside `Multipart`.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentSession(
            parts
                .extensions
                .get::<Session>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}
