use crate::keys::{encode_key_path, file_name, is_safe_key};
use crate::signing::UrlSigner;
use crate::traits::{
    report, ByteStream, ObjectHandle, ObjectMetadata, ProgressSender, Storage, StorageError,
    StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Size of each chunk written by `upload_resumable`.
const CHUNK_SIZE: usize = 256 * 1024;

/// Staging directory for in-flight uploads, relative to the base path.
const STAGING_DIR: &str = ".uploads";

/// Local filesystem storage implementation
///
/// Retrieval URLs point at `{base_url}/{key}?token=...` and are served by the API,
/// which checks the token with the same [`UrlSigner`].
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signer: UrlSigner,
    url_ttl: Duration,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/elecdocs")
    /// * `base_url` - Base URL the API serves files under (e.g., "http://localhost:4000/files")
    /// * `signer` - Signs retrieval URLs
    /// * `url_ttl` - Lifetime of each retrieval URL
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signer: UrlSigner,
        url_ttl: Duration,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(base_path.join(STAGING_DIR))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            signer,
            url_ttl,
        })
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing path traversal sequences or resolving outside the
    /// base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if !is_safe_key(storage_key) || storage_key.split('/').next() == Some(STAGING_DIR) {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn generate_url(&self, key: &str) -> StorageResult<String> {
        let token = self
            .signer
            .sign(key, self.url_ttl)
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;
        Ok(format!(
            "{}/{}?token={}",
            self.base_url.trim_end_matches('/'),
            encode_key_path(key),
            token
        ))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_chunks(
        &self,
        staging: &Path,
        data: &Bytes,
        progress: &ProgressSender,
    ) -> StorageResult<()> {
        let total = data.len() as u64;
        let mut file = fs::File::create(staging).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                staging.display(),
                e
            ))
        })?;

        if data.is_empty() {
            report(progress, 0, 0).await;
        }

        let mut written = 0u64;
        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    staging.display(),
                    e
                ))
            })?;
            written += chunk.len() as u64;
            report(progress, written, total).await;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", staging.display(), e))
        })?;
        Ok(())
    }
}

fn not_found_or(err: std::io::Error, key: &str, other: impl FnOnce(String) -> StorageError) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(key.to_string())
    } else {
        other(err.to_string())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list(&self, folder: &str) -> StorageResult<Vec<ObjectHandle>> {
        let folder = folder.trim_end_matches('/');
        let dir = self.key_to_path(folder)?;
        let start = std::time::Instant::now();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // A folder nobody has uploaded to yet is simply empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::ListFailed(e.to_string())),
        };

        let mut handles = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::ListFailed(e.to_string()))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            handles.push(ObjectHandle {
                key: format!("{}/{}", folder, name),
                name,
            });
        }
        handles.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            folder = %folder,
            count = handles.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage list successful"
        );

        Ok(handles)
    }

    async fn retrieval_url(&self, handle: &ObjectHandle) -> StorageResult<String> {
        self.key_to_path(&handle.key)?;
        self.generate_url(&handle.key)
    }

    async fn metadata(&self, handle: &ObjectHandle) -> StorageResult<ObjectMetadata> {
        let path = self.key_to_path(&handle.key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or(e, &handle.key, StorageError::BackendError))?;

        let created = meta.created().or_else(|_| meta.modified())?;
        let content_type = mime_guess::from_path(file_name(&handle.key))
            .first_raw()
            .map(str::to_string);

        Ok(ObjectMetadata {
            content_type,
            size: meta.len(),
            created_at: DateTime::<Utc>::from(created),
        })
    }

    async fn upload_resumable(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressSender,
    ) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let staging = self
            .base_path
            .join(STAGING_DIR)
            .join(uuid::Uuid::new_v4().to_string());
        let size = data.len();
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        if let Err(e) = self.write_chunks(&staging, &data, &progress).await {
            let _ = fs::remove_file(&staging).await;
            tracing::error!(
                error = %e,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Local storage upload failed"
            );
            return Err(e);
        }

        fs::rename(&staging, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to move file into {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(e, key, StorageError::DeleteFailed))?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or(e, key, StorageError::DownloadFailed))?;

        let key = key.to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::traits::TransferProgress;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(
            dir,
            "http://localhost:4000/files".to_string(),
            UrlSigner::new("test-secret"),
            Duration::from_secs(3600),
        )
        .await
        .unwrap()
    }

    async fn upload(storage: &LocalStorage, key: &str, data: &[u8]) -> Vec<TransferProgress> {
        let (tx, mut rx) = mpsc::channel(1024);
        storage
            .upload_resumable(key, "application/pdf", Bytes::copy_from_slice(data), tx)
            .await
            .unwrap();
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_upload_list_and_metadata() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        upload(&storage, "swl/b.pdf", b"%PDF-1.4 b").await;
        upload(&storage, "swl/a.pdf", b"%PDF-1.4 a").await;
        upload(&storage, "img/photo.png", b"png").await;

        let handles = storage.list("swl").await.unwrap();
        let names: Vec<_> = handles.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(handles[0].key, "swl/a.pdf");

        let meta = storage.metadata(&handles[0]).await.unwrap();
        assert_eq!(meta.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(meta.size, 10);

        let photos = storage.list("img").await.unwrap();
        let meta = storage.metadata(&photos[0]).await.unwrap();
        assert_eq!(meta.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_list_missing_folder_is_empty() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        assert!(storage.list("wid").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_subdirectories() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        upload(&storage, "swl/a.pdf", b"a").await;
        upload(&storage, "swl/nested/b.pdf", b"b").await;

        let handles = storage.list("swl").await.unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name, "a.pdf");
    }

    #[tokio::test]
    async fn test_unknown_extension_has_no_content_type() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        upload(&storage, "cas/blob", b"x").await;
        let handles = storage.list("cas").await.unwrap();
        let meta = storage.metadata(&handles[0]).await.unwrap();
        assert_eq!(meta.content_type, None);
    }

    #[tokio::test]
    async fn test_upload_reports_monotonic_progress() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let data = vec![7u8; CHUNK_SIZE * 2 + 10];

        let events = upload(&storage, "prs/big.pdf", &data).await;
        assert_eq!(events.len(), 3);
        assert!(events
            .windows(2)
            .all(|w| w[0].bytes_transferred <= w[1].bytes_transferred));
        let last = events.last().unwrap();
        assert_eq!(last.bytes_transferred, data.len() as u64);
        assert_eq!(last.total_bytes, data.len() as u64);
    }

    #[tokio::test]
    async fn test_empty_upload_reports_once() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let events = upload(&storage, "prs/empty.pdf", b"").await;
        assert_eq!(
            events,
            vec![TransferProgress {
                bytes_transferred: 0,
                total_bytes: 0
            }]
        );
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        upload(&storage, "swl/a.pdf", b"first").await;
        upload(&storage, "swl/a.pdf", b"second!").await;

        let handles = storage.list("swl").await.unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(storage.metadata(&handles[0]).await.unwrap().size, 7);
    }

    #[tokio::test]
    async fn test_retrieval_url_is_signed() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        upload(&storage, "img/site photo.jpg", b"jpg").await;
        let handle = storage.list("img").await.unwrap().remove(0);

        let url = storage.retrieval_url(&handle).await.unwrap();
        assert!(url.starts_with("http://localhost:4000/files/img/site%20photo.jpg?token="));
        let token = url.split("token=").nth(1).unwrap();
        assert!(storage.signer().verify("img/site photo.jpg", token).is_ok());
        assert!(storage.signer().verify("img/other.jpg", token).is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete("swl/nonexistent.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        upload(&storage, "swl/a.pdf", b"a").await;
        storage.delete("swl/a.pdf").await.unwrap();
        assert!(storage.list("swl").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.download_stream("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.list("/etc").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.list(STAGING_DIR).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_download_stream() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let data = b"stream download test".to_vec();
        upload(&storage, "ict/net.pdf", &data).await;

        let mut stream = storage.download_stream("ict/net.pdf").await.unwrap();
        let mut downloaded = Vec::new();
        while let Some(chunk) = stream.next().await {
            downloaded.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(data, downloaded);

        let missing = storage.download_stream("ict/none.pdf").await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }
}
