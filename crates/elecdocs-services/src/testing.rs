//! In-memory storage double with call counters and failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use elecdocs_core::{Category, CategoryRegistry, Identity};
use elecdocs_storage::{
    ByteStream, ObjectHandle, ObjectMetadata, ProgressSender, Storage, StorageBackend,
    StorageError, StorageResult, TransferProgress,
};

use crate::directory::{DirectoryService, DirectoryView};
use crate::session::{AdminAllowList, Session};

pub const CHUNK: usize = 4;

struct StoredObject {
    key: String,
    data: Bytes,
    content_type: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<Vec<StoredObject>>,
    pub list_calls: AtomicUsize,
    pub url_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_upload: AtomicBool,
    pub fail_delete: AtomicBool,
    fail_metadata_for: Mutex<Option<String>>,
    list_gate: Mutex<Option<ListGate>>,
}

/// Holds the next `list` call until released.
#[derive(Clone, Default)]
pub struct ListGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl FakeStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, key: &str, content_type: Option<&str>, size: usize) {
        let mut objects = self.objects.lock().unwrap();
        let index = objects.len() as i64;
        objects.push(StoredObject {
            key: key.to_string(),
            data: Bytes::from(vec![0u8; size]),
            content_type: content_type.map(str::to_string),
            created_at: Utc.timestamp_opt(1_700_000_000 + index, 0).unwrap(),
        });
    }

    pub fn fail_metadata_for(&self, key: &str) {
        *self.fail_metadata_for.lock().unwrap() = Some(key.to_string());
    }

    /// Block the next `list` call until `release` is notified.
    pub fn gate_next_list(&self) -> ListGate {
        let gate = ListGate::default();
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.key.clone())
            .collect()
    }

    pub fn backend_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.url_calls.load(Ordering::SeqCst)
            + self.metadata_calls.load(Ordering::SeqCst)
            + self.upload_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for FakeStorage {
    async fn list(&self, folder: &str) -> StorageResult<Vec<ObjectHandle>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.list_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorageError::ListFailed("network unreachable".to_string()));
        }
        let prefix = format!("{}/", folder);
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter_map(|o| {
                let name = o.key.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| ObjectHandle {
                    key: o.key.clone(),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    async fn retrieval_url(&self, handle: &ObjectHandle) -> StorageResult<String> {
        // Each call signs anew, like a presigned URL with a fresh expiry.
        let n = self.url_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://files.test/{}?sig={}", handle.key, n))
    }

    async fn metadata(&self, handle: &ObjectHandle) -> StorageResult<ObjectMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata_for.lock().unwrap().as_deref() == Some(handle.key.as_str()) {
            return Err(StorageError::BackendError("metadata unavailable".to_string()));
        }
        let objects = self.objects.lock().unwrap();
        let object = objects
            .iter()
            .find(|o| o.key == handle.key)
            .ok_or_else(|| StorageError::NotFound(handle.key.clone()))?;
        Ok(ObjectMetadata {
            content_type: object.content_type.clone(),
            size: object.data.len() as u64,
            created_at: object.created_at,
        })
    }

    async fn upload_resumable(
        &self,
        key: &str,
        content_type: &str,
        data: Bytes,
        progress: ProgressSender,
    ) -> StorageResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let total = data.len() as u64;
        if data.is_empty() {
            let _ = progress
                .send(TransferProgress {
                    bytes_transferred: 0,
                    total_bytes: 0,
                })
                .await;
        }
        let mut sent = 0u64;
        for chunk in data.chunks(CHUNK) {
            sent += chunk.len() as u64;
            let _ = progress
                .send(TransferProgress {
                    bytes_transferred: sent,
                    total_bytes: total,
                })
                .await;
            if self.fail_upload.load(Ordering::SeqCst) && sent * 2 >= total {
                return Err(StorageError::UploadFailed("connection reset".to_string()));
            }
        }

        let mut objects = self.objects.lock().unwrap();
        objects.retain(|o| o.key != key);
        objects.push(StoredObject {
            key: key.to_string(),
            data,
            content_type: Some(content_type.to_string()),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("permission denied".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        let before = objects.len();
        objects.retain(|o| o.key != key);
        if objects.len() == before {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(())
    }

    async fn download_stream(&self, key: &str) -> StorageResult<ByteStream> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .iter()
            .find(|o| o.key == key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let data = object.data.clone();
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

pub fn directory(storage: &Arc<FakeStorage>) -> Arc<DirectoryService> {
    Arc::new(DirectoryService::new(
        storage.clone(),
        CategoryRegistry::default(),
    ))
}

pub fn view(storage: &Arc<FakeStorage>, category: Category) -> Arc<DirectoryView> {
    Arc::new(DirectoryView::new(directory(storage), category))
}

pub fn admins() -> AdminAllowList {
    AdminAllowList::new(["admin@example.com"])
}

pub fn user() -> Session {
    Session::signed_in(Identity::new("u1", Some("user@example.com".to_string())), &admins())
}

pub fn admin() -> Session {
    Session::signed_in(Identity::new("u0", Some("admin@example.com".to_string())), &admins())
}
