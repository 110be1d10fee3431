//! Upload workflow: validate, transfer with progress, refresh.
//!
//! Validation runs synchronously before any backend call. The transfer itself
//! runs in a spawned task that reports [`UploadEvent`]s on a bounded channel:
//! zero or more `Progress` events, then exactly one of `Completed` or `Failed`,
//! and after `Completed` one `Refreshed` or `RefreshFailed`.

use std::sync::Arc;

use bytes::Bytes;
use elecdocs_core::constants::MAX_UPLOAD_BYTES;
use elecdocs_core::{AppError, Category, Document, ErrorMetadata, Operation, ValidationFailure};
use elecdocs_storage::keys::object_key;
use elecdocs_storage::TransferProgress;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::directory::DirectoryView;
use crate::session::Session;

pub const UPLOAD_LOGIN_REQUIRED_MESSAGE: &str = "Please log in to upload files";

const EVENT_BUFFER: usize = 32;
const PROGRESS_BUFFER: usize = 16;

/// A file as handed over by the caller.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileUpload {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UploadEvent {
    /// Whole percent in 0..=100, never decreasing within one upload.
    Progress { percent: u8 },
    Completed,
    Failed { message: String },
    Refreshed { documents: Vec<Document> },
    RefreshFailed { message: String },
}

/// Check size and type constraints for `category`, in that order.
pub fn validate(category: Category, file: &FileUpload) -> Result<(), ValidationFailure> {
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationFailure::TooLarge { size: file.size() });
    }
    if !category.accepts_content_type(&file.content_type) {
        return Err(if category.is_photo() {
            ValidationFailure::NotAnImage {
                content_type: file.content_type.clone(),
            }
        } else {
            ValidationFailure::NotAPdf {
                content_type: file.content_type.clone(),
            }
        });
    }
    validate_file_name(&file.file_name)
}

/// A file name must stay inside its folder.
fn validate_file_name(file_name: &str) -> Result<(), ValidationFailure> {
    if file_name.trim().is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name == "."
        || file_name == ".."
        || file_name.chars().any(char::is_control)
    {
        return Err(ValidationFailure::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

/// Whole-percent progress for one transfer snapshot. Empty files are complete.
pub fn percent(progress: TransferProgress) -> u8 {
    if progress.total_bytes == 0 {
        return 100;
    }
    let ratio = progress.bytes_transferred as f64 / progress.total_bytes as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Clone, Default)]
pub struct UploadWorkflow;

impl UploadWorkflow {
    pub fn new() -> Self {
        Self
    }

    /// Validate `file` and, if it passes, start transferring it into the
    /// view's category. The returned receiver yields the transfer's events.
    ///
    /// Overlapping uploads are neither deduplicated nor queued; an upload to an
    /// existing name overwrites it.
    pub fn start(
        &self,
        session: &Session,
        view: Arc<DirectoryView>,
        file: FileUpload,
    ) -> Result<mpsc::Receiver<UploadEvent>, AppError> {
        let identity = session.require_identity(UPLOAD_LOGIN_REQUIRED_MESSAGE)?;
        let category = view.category();
        validate(category, &file)?;

        let folder = view.service().categories().resolve_folder(category);
        let key = object_key(folder, &file.file_name);

        tracing::info!(
            user_id = %identity.uid,
            category = %category,
            key = %key,
            size_bytes = file.size(),
            content_type = %file.content_type,
            "Starting upload"
        );

        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let session = session.clone();
        tokio::spawn(async move {
            run_transfer(session, view, key, file, events).await;
        });
        Ok(receiver)
    }
}

async fn run_transfer(
    session: Session,
    view: Arc<DirectoryView>,
    key: String,
    file: FileUpload,
    events: mpsc::Sender<UploadEvent>,
) {
    let storage = view.service().storage().clone();
    let (progress_tx, mut progress_rx) = mpsc::channel::<TransferProgress>(PROGRESS_BUFFER);
    let start = std::time::Instant::now();

    let transfer = storage.upload_resumable(&key, &file.content_type, file.data.clone(), progress_tx);
    let forward = async {
        let mut last: Option<u8> = None;
        while let Some(snapshot) = progress_rx.recv().await {
            let pct = percent(snapshot);
            if last.map_or(true, |prev| pct > prev) {
                last = Some(pct);
                // A vanished receiver does not stop the transfer.
                let _ = events.send(UploadEvent::Progress { percent: pct }).await;
            }
        }
    };
    let (result, ()) = tokio::join!(transfer, forward);

    if let Err(e) = result {
        let err = e.into_app_error(Operation::Upload);
        tracing::error!(
            error = %err,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload failed"
        );
        let _ = events
            .send(UploadEvent::Failed {
                message: Operation::Upload.failure_message().to_string(),
            })
            .await;
        return;
    }

    tracing::info!(
        key = %key,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Upload completed"
    );
    let _ = events.send(UploadEvent::Completed).await;

    let event = match view.refresh(&session).await {
        Ok(outcome) => UploadEvent::Refreshed {
            documents: outcome.into_documents(),
        },
        Err(err) => UploadEvent::RefreshFailed {
            message: err.client_message(),
        },
    };
    let _ = events.send(event).await;
}
