use crate::traits::{
    report, ByteStream, ObjectHandle, ObjectMetadata, ProgressSender, Storage, StorageError,
    StorageResult,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, MultipartUpload, ObjectStore,
    ObjectStoreExt, PutMultipartOptions, PutPayload, Result as ObjectResult,
};
use std::time::Duration;

/// S3 requires every multipart part except the last to be at least 5 MiB.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    url_ttl: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `url_ttl` - Lifetime of presigned retrieval URLs
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        url_ttl: Duration,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            url_ttl,
        })
    }

    async fn put_parts(
        &self,
        upload: &mut Box<dyn MultipartUpload>,
        data: &Bytes,
        progress: &ProgressSender,
    ) -> ObjectResult<()> {
        let total = data.len() as u64;
        if data.is_empty() {
            report(progress, 0, 0).await;
            return Ok(());
        }

        let mut sent = 0usize;
        while sent < data.len() {
            let end = (sent + PART_SIZE).min(data.len());
            upload
                .put_part(PutPayload::from(data.slice(sent..end)))
                .await?;
            sent = end;
            report(progress, sent as u64, total).await;
        }
        Ok(())
    }
}

fn map_not_found(e: ObjectStoreError, key: &str, other: impl FnOnce(String) -> StorageError) -> StorageError {
    match e {
        ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
        e => other(e.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn list(&self, folder: &str) -> StorageResult<Vec<ObjectHandle>> {
        let start = std::time::Instant::now();
        let prefix = Path::from(folder.trim_end_matches('/'));

        let result: ObjectResult<_> = self.store.list_with_delimiter(Some(&prefix)).await;
        let listing = result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                folder = %folder,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 list failed"
            );
            StorageError::ListFailed(e.to_string())
        })?;

        let handles: Vec<ObjectHandle> = listing
            .objects
            .into_iter()
            .filter_map(|meta| {
                let name = meta.location.filename()?.to_string();
                Some(ObjectHandle {
                    key: meta.location.to_string(),
                    name,
                })
            })
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            folder = %folder,
            count = handles.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(handles)
    }

    async fn retrieval_url(&self, handle: &ObjectHandle) -> StorageResult<String> {
        let location = Path::from(handle.key.as_str());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, self.url_ttl)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    async fn metadata(&self, handle: &ObjectHandle) -> StorageResult<ObjectMetadata> {
        let location = Path::from(handle.key.as_str());
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result: ObjectResult<_> = self.store.get_opts(&location, options).await;
        let result = result.map_err(|e| map_not_found(e, &handle.key, StorageError::BackendError))?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| AsRef::<str>::as_ref(value).to_string());

        Ok(ObjectMetadata {
            content_type,
            size: result.meta.size,
            created_at: result.meta.last_modified,
        })
    }

    async fn upload_resumable(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressSender,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = data.len() as u64;
        let location = Path::from(key);

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutMultipartOptions {
            attributes,
            ..Default::default()
        };

        let mut upload = self
            .store
            .put_multipart_opts(&location, options)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let outcome = match self.put_parts(&mut upload, &data, &progress).await {
            Ok(()) => upload.complete().await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            if let Err(abort_err) = upload.abort().await {
                tracing::warn!(
                    error = %abort_err,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 multipart abort failed"
                );
            }
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    /// S3 deletes are idempotent: deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key);

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            map_not_found(e, key, StorageError::DeleteFailed)
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let start = std::time::Instant::now();
        let location = Path::from(key);

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| map_not_found(e, key, StorageError::DownloadFailed))?;

        let bucket = self.bucket.clone();
        let key = key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
