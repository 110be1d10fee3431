//! Storage setup and initialization

use anyhow::Result;
use elecdocs_core::{Config, StorageBackend};
use elecdocs_storage::{create_storage, Storage, UrlSigner};
use std::sync::Arc;

/// Create the configured backend. For the local backend also return the signer
/// the `/files` route verifies retrieval tokens with.
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Option<UrlSigner>)> {
    tracing::info!("Initializing storage backend...");

    let signer = match config.url_signing_secret() {
        Some(secret) => UrlSigner::new(secret),
        None => {
            if config.storage_backend() == StorageBackend::Local {
                tracing::warn!(
                    "URL_SIGNING_SECRET not set; file links will stop working after a restart"
                );
            }
            UrlSigner::random()
        }
    };

    let storage = create_storage(config, signer.clone()).await?;
    let backend = storage.backend_type();
    tracing::info!(backend = ?backend, "Storage backend initialized");

    let file_signer = (backend == StorageBackend::Local).then_some(signer);
    Ok((storage, file_signer))
}
