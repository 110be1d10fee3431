//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::Authenticator;
use crate::state::AppState;
use anyhow::{Context, Result};
use elecdocs_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        storage_backend = ?config.storage_backend(),
        "Configuration loaded and validated successfully"
    );

    let state = build_state(config).await?;
    let router = routes::setup_routes(state.clone())?;

    Ok((state, router))
}

/// Storage, authentication and workflow state for an already validated config.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let (storage, file_signer) = storage::setup_storage(&config).await?;
    let authenticator = Authenticator::from_config(&config)?;
    Ok(Arc::new(AppState::new(
        config,
        storage,
        authenticator,
        file_signer,
    )))
}
