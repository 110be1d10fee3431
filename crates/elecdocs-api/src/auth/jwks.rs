//! RS256/ES256 verification with keys fetched from a JWKS endpoint.
//!
//! Decoding keys are cached per key id and refetched once their TTL lapses, so
//! provider key rotation is picked up without a restart.

use crate::auth::jwt::{decode_claims, INVALID_TOKEN_MESSAGE};
use crate::auth::models::JwtClaims;
use chrono::{DateTime, Utc};
use elecdocs_core::AppError;
use jsonwebtoken::{DecodingKey, Header};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "kid")]
    pub key_id: Option<String>,
    #[serde(rename = "n")]
    pub modulus: Option<String>,
    #[serde(rename = "e")]
    pub exponent: Option<String>,
    #[serde(rename = "x")]
    pub x_coordinate: Option<String>,
    #[serde(rename = "y")]
    pub y_coordinate: Option<String>,
    #[serde(rename = "crv")]
    pub curve: Option<String>,
}

#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    expires_at: DateTime<Utc>,
}

pub struct JwksVerifier {
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedKey>>>,
    cache_ttl_secs: i64,
}

fn key_error(message: impl Into<String>) -> AppError {
    let message = message.into();
    tracing::warn!(reason = %message, "JWKS key unusable");
    AppError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())
}

impl JwksVerifier {
    pub fn new(jwks_url: String, cache_ttl_secs: Option<i64>) -> Self {
        Self {
            jwks_url,
            client: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl_secs: cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        }
    }

    async fn fetch_jwks(&self) -> Result<Jwks, AppError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| key_error(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(key_error(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| key_error(format!("Failed to parse JWKS: {}", e)))?;

        tracing::debug!(
            keys = jwks.keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetched JWKS"
        );
        Ok(jwks)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, AppError> {
        let cache_key = kid.unwrap_or("default").to_string();

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&cache_key) {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.key.clone());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;
        let jwk = match kid {
            Some(kid) => jwks
                .keys
                .iter()
                .find(|k| k.key_id.as_deref() == Some(kid))
                .ok_or_else(|| key_error(format!("Key id {} not found in JWKS", kid)))?,
            None => jwks
                .keys
                .first()
                .ok_or_else(|| key_error("JWKS contains no keys"))?,
        };
        let key = to_decoding_key(jwk)?;

        self.cache.write().await.insert(
            cache_key,
            CachedKey {
                key: key.clone(),
                expires_at: Utc::now() + chrono::Duration::seconds(self.cache_ttl_secs),
            },
        );
        Ok(key)
    }

    pub async fn validate_token(&self, token: &str, header: &Header) -> Result<JwtClaims, AppError> {
        let key = self.decoding_key(header.kid.as_deref()).await?;
        decode_claims(token, &key, header.alg)
    }
}

fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AppError> {
    match jwk.key_type.as_str() {
        "RSA" => {
            let n = jwk
                .modulus
                .as_deref()
                .ok_or_else(|| key_error("RSA key missing modulus"))?;
            let e = jwk
                .exponent
                .as_deref()
                .ok_or_else(|| key_error("RSA key missing exponent"))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| key_error(format!("Failed to build RSA key: {}", e)))
        }
        "EC" => {
            let curve = jwk.curve.as_deref().unwrap_or_default();
            if curve != "P-256" {
                return Err(key_error(format!("Unsupported EC curve: {}", curve)));
            }
            let x = jwk
                .x_coordinate
                .as_deref()
                .ok_or_else(|| key_error("EC key missing x coordinate"))?;
            let y = jwk
                .y_coordinate
                .as_deref()
                .ok_or_else(|| key_error("EC key missing y coordinate"))?;
            DecodingKey::from_ec_components(x, y)
                .map_err(|e| key_error(format!("Failed to build EC key: {}", e)))
        }
        other => Err(key_error(format!("Unsupported key type: {}", other))),
    }
}
