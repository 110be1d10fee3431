//! Configuration module
//!
//! Settings are read from the process environment (with `.env` support via
//! dotenvy) into [`Config`], which exposes typed getters and a `validate` step
//! run once at startup.

use std::env;

use crate::category::CategoryRegistry;
use crate::constants::{DEFAULT_DELETE_REQUEST_TTL_SECS, DEFAULT_SIGNED_URL_TTL_SECS};
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 4000;
const MIN_JWT_SECRET_LEN: usize = 32;

/// Console log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    server_port: u16,
    environment: String,
    cors_origins: Vec<String>,
    jwt_secret: Option<String>,
    auth_jwks_url: Option<String>,
    admin_emails: Vec<String>,
    categories: CategoryRegistry,
    storage_backend: StorageBackend,
    s3_bucket: Option<String>,
    s3_region: Option<String>,
    s3_endpoint: Option<String>,
    local_storage_path: Option<String>,
    local_storage_base_url: Option<String>,
    url_signing_secret: Option<String>,
    signed_url_ttl_secs: u64,
    delete_request_ttl_secs: u64,
    log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        if is_production_env(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins = split_list(&cors_origins_str);

        let admin_emails = var("ADMIN_EMAILS")
            .map(|s| {
                split_list(&s)
                    .into_iter()
                    .map(|e| e.to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let categories = match var("CATEGORY_FOLDERS") {
            Some(spec) => CategoryRegistry::with_overrides(CategoryRegistry::parse_overrides(&spec)?)?,
            None => CategoryRegistry::default(),
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let log_format = match var("LOG_FORMAT").map(|s| s.trim().to_lowercase()) {
            Some(ref s) if s == "json" => LogFormat::Json,
            Some(ref s) if s == "compact" || s == "pretty" || s.is_empty() => LogFormat::Compact,
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "LOG_FORMAT must be 'json' or 'compact', got '{}'",
                    other
                ))
            }
            None => LogFormat::Compact,
        };

        Ok(Config {
            server_port: var("PORT")
                .unwrap_or_else(|| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            jwt_secret: var("JWT_SECRET").filter(|s| !s.is_empty()),
            auth_jwks_url: var("AUTH_JWKS_URL").filter(|s| !s.is_empty()),
            admin_emails,
            categories,
            storage_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            url_signing_secret: var("URL_SIGNING_SECRET").filter(|s| !s.is_empty()),
            signed_url_ttl_secs: parse_secs(
                var("SIGNED_URL_TTL_SECS"),
                "SIGNED_URL_TTL_SECS",
                DEFAULT_SIGNED_URL_TTL_SECS,
            )?,
            delete_request_ttl_secs: parse_secs(
                var("DELETE_REQUEST_TTL_SECS"),
                "DELETE_REQUEST_TTL_SECS",
                DEFAULT_DELETE_REQUEST_TTL_SECS,
            )?,
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match (&self.jwt_secret, &self.auth_jwks_url) {
            (None, None) => {
                return Err(anyhow::anyhow!(
                    "Either JWT_SECRET or AUTH_JWKS_URL must be set for authentication"
                ));
            }
            (Some(secret), _) if secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(anyhow::anyhow!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_JWT_SECRET_LEN
                ));
            }
            _ => {}
        }

        if let Some(secret) = &self.url_signing_secret {
            if secret.len() < MIN_JWT_SECRET_LEN {
                return Err(anyhow::anyhow!(
                    "URL_SIGNING_SECRET must be at least {} characters long",
                    MIN_JWT_SECRET_LEN
                ));
            }
        }

        if self.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_TTL_SECS must be greater than zero"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_env(&self.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.cors_origins
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }

    pub fn auth_jwks_url(&self) -> Option<&str> {
        self.auth_jwks_url.as_deref()
    }

    /// Lowercased admin allow-list.
    pub fn admin_emails(&self) -> &[String] {
        &self.admin_emails
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.local_storage_base_url.as_deref()
    }

    /// Secret for local-backend retrieval tokens. Unset means a per-process key.
    pub fn url_signing_secret(&self) -> Option<&str> {
        self.url_signing_secret.as_deref()
    }

    pub fn signed_url_ttl_secs(&self) -> u64 {
        self.signed_url_ttl_secs
    }

    pub fn delete_request_ttl_secs(&self) -> u64 {
        self.delete_request_ttl_secs
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn is_production_env(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64, anyhow::Error> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", key)),
        None => Ok(default),
    }
}
