//! Directory listing for a category folder.
//!
//! [`DirectoryService`] turns the objects in a category folder into fully
//! described [`Document`]s. [`DirectoryView`] keeps the most recent listing of
//! one category and is what the upload and delete workflows refresh after they
//! mutate the folder.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use elecdocs_core::constants::DEFAULT_CONTENT_TYPE;
use elecdocs_core::{AppError, Category, CategoryRegistry, Document, Operation};
use elecdocs_storage::{ObjectHandle, Storage, StorageError};
use futures::future::try_join_all;

use crate::session::Session;

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to view files";

fn listing_error(err: StorageError) -> AppError {
    AppError::backend(Operation::ListDocuments, err.to_string())
}

pub struct DirectoryService {
    storage: Arc<dyn Storage>,
    categories: CategoryRegistry,
}

impl DirectoryService {
    pub fn new(storage: Arc<dyn Storage>, categories: CategoryRegistry) -> Self {
        Self {
            storage,
            categories,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    /// List every document in `category`, in backend enumeration order.
    ///
    /// URL and metadata of each object are resolved concurrently and the whole
    /// listing fails if any single resolution fails. Nothing is cached: every
    /// call reflects the backend's current state.
    #[tracing::instrument(skip(self, session))]
    pub async fn list_documents(
        &self,
        session: &Session,
        category: Category,
    ) -> Result<Vec<Document>, AppError> {
        session.require_identity(LOGIN_REQUIRED_MESSAGE)?;

        let folder = self.categories.resolve_folder(category);
        let start = std::time::Instant::now();

        let handles = self.storage.list(folder).await.map_err(|e| {
            tracing::error!(error = %e, folder = %folder, "Listing folder failed");
            listing_error(e)
        })?;

        let documents = try_join_all(handles.iter().map(|handle| self.describe(handle)))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, folder = %folder, "Describing documents failed");
                listing_error(e)
            })?;

        tracing::debug!(
            folder = %folder,
            count = documents.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Listed documents"
        );

        Ok(documents)
    }

    /// Image documents of `category`, in listing order.
    pub async fn gallery(
        &self,
        session: &Session,
        category: Category,
    ) -> Result<Vec<Document>, AppError> {
        let documents = self.list_documents(session, category).await?;
        Ok(documents.into_iter().filter(Document::is_image).collect())
    }

    async fn describe(&self, handle: &ObjectHandle) -> Result<Document, StorageError> {
        let (url, metadata) = tokio::try_join!(
            self.storage.retrieval_url(handle),
            self.storage.metadata(handle)
        )?;

        Ok(Document {
            name: handle.name.clone(),
            url,
            content_type: metadata
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            size: metadata.size,
            last_modified: metadata.created_at,
        })
    }
}

/// Result of a [`DirectoryView::refresh`]. Both variants carry the listing
/// this refresh produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The listing was newer than what the view held and replaced it.
    Applied(Vec<Document>),
    /// A refresh started later already completed, so the view kept its state.
    Superseded(Vec<Document>),
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied(_))
    }

    pub fn documents(&self) -> &[Document] {
        match self {
            RefreshOutcome::Applied(documents) | RefreshOutcome::Superseded(documents) => {
                documents
            }
        }
    }

    pub fn into_documents(self) -> Vec<Document> {
        match self {
            RefreshOutcome::Applied(documents) | RefreshOutcome::Superseded(documents) => {
                documents
            }
        }
    }
}

#[derive(Debug, Default)]
struct ViewState {
    documents: Vec<Document>,
    applied_seq: u64,
    last_error: Option<String>,
}

/// Displayed listing of one category.
///
/// Every refresh takes a sequence number before it lists. A completed refresh
/// only replaces the displayed state when its number is newer than the last
/// applied one, so an older listing that finishes late never overwrites a
/// newer one.
pub struct DirectoryView {
    service: Arc<DirectoryService>,
    category: Category,
    next_seq: AtomicU64,
    state: Mutex<ViewState>,
}

impl DirectoryView {
    pub fn new(service: Arc<DirectoryService>, category: Category) -> Self {
        Self {
            service,
            category,
            next_seq: AtomicU64::new(0),
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn service(&self) -> &Arc<DirectoryService> {
        &self.service
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn documents(&self) -> Vec<Document> {
        self.lock().documents.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a successful listing if it is newer than the one on display.
    fn complete(&self, seq: u64, documents: &[Document]) -> bool {
        let mut state = self.lock();
        if seq <= state.applied_seq {
            tracing::debug!(
                category = %self.category,
                seq,
                applied_seq = state.applied_seq,
                "Discarding stale listing"
            );
            return false;
        }
        state.applied_seq = seq;
        state.documents = documents.to_vec();
        state.last_error = None;
        true
    }

    /// Record a failed refresh. The displayed listing and its sequence number
    /// stay as they are.
    fn fail(&self, seq: u64, err: &AppError) {
        let mut state = self.lock();
        if seq > state.applied_seq {
            state.last_error = Some(elecdocs_core::ErrorMetadata::client_message(err));
        }
    }

    /// Re-list the category and apply the result if it is the newest.
    ///
    /// The caller always gets its own listing back, even when a newer one is
    /// already on display.
    pub async fn refresh(&self, session: &Session) -> Result<RefreshOutcome, AppError> {
        session.require_identity(LOGIN_REQUIRED_MESSAGE)?;
        let seq = self.begin();
        match self.service.list_documents(session, self.category).await {
            Ok(documents) => Ok(if self.complete(seq, &documents) {
                RefreshOutcome::Applied(documents)
            } else {
                RefreshOutcome::Superseded(documents)
            }),
            Err(err) => {
                self.fail(seq, &err);
                Err(err)
            }
        }
    }
}
