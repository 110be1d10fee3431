//! Token verification.
//!
//! HS256 tokens are checked against `JWT_SECRET`. RS256/ES256 tokens are
//! checked against keys published at `AUTH_JWKS_URL`.

use crate::auth::models::JwtClaims;
use elecdocs_core::{AppError, Config};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};

#[cfg(feature = "jwt-jwks")]
use crate::auth::jwks::JwksVerifier;

pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

pub struct Authenticator {
    hs256: Option<DecodingKey>,
    #[cfg(feature = "jwt-jwks")]
    jwks: Option<JwksVerifier>,
}

impl Authenticator {
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let hs256 = config
            .jwt_secret()
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()));

        #[cfg(feature = "jwt-jwks")]
        let jwks = config
            .auth_jwks_url()
            .map(|url| JwksVerifier::new(url.to_string(), None));

        #[cfg(not(feature = "jwt-jwks"))]
        if config.auth_jwks_url().is_some() {
            return Err(anyhow::anyhow!(
                "AUTH_JWKS_URL is set but the jwt-jwks feature is not enabled"
            ));
        }

        Ok(Self {
            hs256,
            #[cfg(feature = "jwt-jwks")]
            jwks,
        })
    }

    /// Verifier accepting only HS256 tokens signed with `secret`.
    pub fn hs256(secret: &str) -> Self {
        Self {
            hs256: Some(DecodingKey::from_secret(secret.as_bytes())),
            #[cfg(feature = "jwt-jwks")]
            jwks: None,
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<JwtClaims, AppError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Invalid token header");
            AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())
        })?;

        match header.alg {
            Algorithm::HS256 if self.hs256.is_some() => match &self.hs256 {
                Some(key) => decode_claims(token, key, Algorithm::HS256),
                None => Err(AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())),
            },
            #[cfg(feature = "jwt-jwks")]
            Algorithm::RS256 | Algorithm::ES256 if self.jwks.is_some() => match &self.jwks {
                Some(jwks) => jwks.validate_token(token, &header).await,
                None => Err(AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())),
            },
            alg => {
                tracing::debug!(algorithm = ?alg, "Token algorithm not accepted");
                Err(AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string()))
            }
        }
    }
}

pub(crate) fn decode_claims(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<JwtClaims, AppError> {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<JwtClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    AppError::Unauthenticated("Token has expired".to_string())
                }
                _ => AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string()),
            }
        })
}
