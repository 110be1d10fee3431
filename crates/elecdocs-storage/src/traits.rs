//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use elecdocs_core::{AppError, Operation};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Map into the application taxonomy, attributing the failure to `operation`.
    pub fn into_app_error(self, operation: Operation) -> AppError {
        match self {
            StorageError::NotFound(key) => AppError::not_found(operation, key),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            other => AppError::backend(operation, other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reference to one enumerated object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHandle {
    /// Full storage key (`{folder}/{name}`)
    pub key: String,
    /// File name (last key segment)
    pub name: String,
}

/// Attributes reported by the backend for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// MIME type, when the backend knows one
    pub content_type: Option<String>,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Progress of an in-flight upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

/// Channel on which uploads report progress after each chunk.
///
/// A closed receiver never fails the upload.
pub type ProgressSender = mpsc::Sender<TransferProgress>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait so the
/// directory, upload and delete workflows can run against any of them.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Enumerate the direct children of `folder`, in backend order.
    async fn list(&self, folder: &str) -> StorageResult<Vec<ObjectHandle>>;

    /// Resolve a time-bounded URL the client can fetch the object from.
    async fn retrieval_url(&self, handle: &ObjectHandle) -> StorageResult<String>;

    /// Read content type, size and creation time of an object.
    async fn metadata(&self, handle: &ObjectHandle) -> StorageResult<ObjectMetadata>;

    /// Store `data` under `key` in chunks, sending a [`TransferProgress`] after
    /// each chunk. An existing object under the same key is overwritten.
    async fn upload_resumable(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressSender,
    ) -> StorageResult<()>;

    /// Delete a file by its storage key
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Download a file as a stream of chunks
    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Send a progress update, ignoring a receiver that has gone away.
pub(crate) async fn report(progress: &ProgressSender, bytes_transferred: u64, total_bytes: u64) {
    let _ = progress
        .send(TransferProgress {
            bytes_transferred,
            total_bytes,
        })
        .await;
}
