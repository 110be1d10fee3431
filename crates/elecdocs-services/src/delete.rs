//! Two-phase, admin-gated delete.
//!
//! `Idle -> PendingConfirm` on request, then either back to `Idle` on cancel,
//! or `Deleting -> Idle` on confirm. A confirm performs exactly one backend
//! delete followed by exactly one refresh of the category view. Failures are
//! not retried.

use std::sync::{Arc, Mutex, MutexGuard};

use elecdocs_core::{AppError, Document, ErrorMetadata, Operation};
use elecdocs_storage::keys::object_key;

use crate::directory::DirectoryView;
use crate::session::Session;

pub const ADMIN_REQUIRED_MESSAGE: &str = "Only administrators can delete files";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePhase {
    Idle,
    PendingConfirm { target: String },
    Deleting { target: String },
}

/// What a confirmed delete reports once the file is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Refreshed { documents: Vec<Document> },
    /// The file was deleted but the follow-up listing failed.
    RefreshFailed { message: String },
}

impl DeleteOutcome {
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            DeleteOutcome::Refreshed { documents } => Some(documents),
            DeleteOutcome::RefreshFailed { .. } => None,
        }
    }
}

#[derive(Debug)]
struct DeleteState {
    phase: DeletePhase,
    last_error: Option<String>,
}

pub struct DeleteWorkflow {
    view: Arc<DirectoryView>,
    state: Mutex<DeleteState>,
}

impl DeleteWorkflow {
    pub fn new(view: Arc<DirectoryView>) -> Self {
        Self {
            view,
            state: Mutex::new(DeleteState {
                phase: DeletePhase::Idle,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeleteState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn phase(&self) -> DeletePhase {
        self.lock().phase.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Name awaiting confirmation, if any.
    pub fn pending_target(&self) -> Option<String> {
        match &self.lock().phase {
            DeletePhase::PendingConfirm { target } => Some(target.clone()),
            _ => None,
        }
    }

    /// Select `name` for deletion. Only administrators may do this; selecting
    /// while another name is pending replaces it.
    pub fn request_delete(&self, session: &Session, name: &str) -> Result<(), AppError> {
        if !session.is_admin() {
            return Err(AppError::Forbidden(ADMIN_REQUIRED_MESSAGE.to_string()));
        }

        let mut state = self.lock();
        if let DeletePhase::Deleting { .. } = state.phase {
            return Err(AppError::InvalidInput(
                "A delete is already in progress".to_string(),
            ));
        }
        state.phase = DeletePhase::PendingConfirm {
            target: name.to_string(),
        };
        state.last_error = None;
        Ok(())
    }

    /// Discard the pending target without touching the backend.
    pub fn cancel(&self) -> Option<String> {
        let mut state = self.lock();
        match std::mem::replace(&mut state.phase, DeletePhase::Idle) {
            DeletePhase::PendingConfirm { target } => Some(target),
            other => {
                state.phase = other;
                None
            }
        }
    }

    /// Delete the pending target, then refresh the category listing.
    ///
    /// Errors only when the delete itself fails. A failed refresh after a
    /// successful delete is reported through [`DeleteOutcome::RefreshFailed`].
    pub async fn confirm(&self, session: &Session) -> Result<DeleteOutcome, AppError> {
        let target = {
            let mut state = self.lock();
            let target = match &state.phase {
                DeletePhase::PendingConfirm { target } => target.clone(),
                _ => {
                    return Err(AppError::InvalidInput(
                        "No file is awaiting delete confirmation".to_string(),
                    ))
                }
            };
            state.phase = DeletePhase::Deleting {
                target: target.clone(),
            };
            target
        };

        let category = self.view.category();
        let folder = self.view.service().categories().resolve_folder(category);
        let key = object_key(folder, &target);
        let start = std::time::Instant::now();

        let result = self.view.service().storage().delete(&key).await;

        {
            let mut state = self.lock();
            state.phase = DeletePhase::Idle;
            if result.is_err() {
                state.last_error = Some(Operation::Delete.failure_message().to_string());
            }
        }

        if let Err(e) = result {
            tracing::error!(
                error = %e,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Delete failed"
            );
            return Err(e.into_app_error(Operation::Delete));
        }

        tracing::info!(
            user_id = session.identity().map(|i| i.uid.as_str()).unwrap_or_default(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Delete completed"
        );

        Ok(match self.view.refresh(session).await {
            Ok(outcome) => DeleteOutcome::Refreshed {
                documents: outcome.into_documents(),
            },
            Err(err) => {
                tracing::warn!(error = %err, key = %key, "Refresh after delete failed");
                DeleteOutcome::RefreshFailed {
                    message: err.client_message(),
                }
            }
        })
    }
}
