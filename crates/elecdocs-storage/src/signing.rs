//! Signed, expiring tokens for retrieval URLs served by the API itself.
//!
//! Token = base64url(expiry_ts (u64 BE) || HMAC-SHA256(secret, expiry_ts || key)).
//! The key is not embedded in the token; it is taken from the request path, so a
//! token only validates for the object it was issued for.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const EXPIRY_LEN: usize = 8;
const MAC_LEN: usize = 32;
const TOKEN_LEN: usize = EXPIRY_LEN + MAC_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid file token")]
    Malformed,

    #[error("File token does not match this file")]
    BadSignature,

    #[error("File token has expired")]
    Expired,

    #[error("Signing key rejected")]
    InvalidKey,
}

#[derive(Clone)]
pub struct UrlSigner {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner").finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Signer with a process-local random secret. Tokens do not survive a restart.
    pub fn random() -> Self {
        let mut secret = Vec::with_capacity(32);
        secret.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        secret.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::new(secret)
    }

    fn mac(&self, expiry_ts: u64, key: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(&expiry_ts.to_be_bytes());
        mac.update(key.as_bytes());
        Ok(mac)
    }

    /// Issue a token for `key` valid for `expires_in`.
    pub fn sign(&self, key: &str, expires_in: Duration) -> Result<String, TokenError> {
        let expiry_ts = now_secs().saturating_add(expires_in.as_secs());
        self.sign_with_expiry(key, expiry_ts)
    }

    fn sign_with_expiry(&self, key: &str, expiry_ts: u64) -> Result<String, TokenError> {
        let tag = self.mac(expiry_ts, key)?.finalize().into_bytes();

        let mut token = [0u8; TOKEN_LEN];
        token[..EXPIRY_LEN].copy_from_slice(&expiry_ts.to_be_bytes());
        token[EXPIRY_LEN..].copy_from_slice(&tag);

        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(token))
    }

    /// Check that `token` was issued for `key` and has not expired.
    pub fn verify(&self, key: &str, token: &str) -> Result<(), TokenError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        if decoded.len() != TOKEN_LEN {
            return Err(TokenError::Malformed);
        }

        let (expiry, tag) = decoded.split_at(EXPIRY_LEN);
        let mut expiry_bytes = [0u8; EXPIRY_LEN];
        expiry_bytes.copy_from_slice(expiry);
        let expiry_ts = u64::from_be_bytes(expiry_bytes);

        self.mac(expiry_ts, key)?
            .verify_slice(tag)
            .map_err(|_| TokenError::BadSignature)?;

        if now_secs() > expiry_ts {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
