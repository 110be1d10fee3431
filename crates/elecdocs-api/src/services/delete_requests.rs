//! Pending delete confirmations.
//!
//! Each delete request owns its own [`DeleteWorkflow`] parked in
//! `PendingConfirm`. The request id is handed to the client, which then either
//! confirms or cancels it. Requests belong to the identity that created them
//! and lapse after a configurable TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use elecdocs_core::AppError;
use elecdocs_services::delete::ADMIN_REQUIRED_MESSAGE;
use elecdocs_services::{DeleteOutcome, DeleteWorkflow, DirectoryView, Session};
use uuid::Uuid;

pub const UNKNOWN_REQUEST_MESSAGE: &str = "Delete request not found or expired";

struct PendingDelete {
    owner: String,
    workflow: DeleteWorkflow,
    created_at: Instant,
}

pub struct DeleteRequests {
    ttl: Duration,
    pending: Mutex<HashMap<Uuid, PendingDelete>>,
}

impl DeleteRequests {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, PendingDelete>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn purge_expired(&self, pending: &mut HashMap<Uuid, PendingDelete>) {
        let before = pending.len();
        pending.retain(|_, p| p.created_at.elapsed() < self.ttl);
        let expired = before - pending.len();
        if expired > 0 {
            tracing::debug!(expired, "Dropped expired delete requests");
        }
    }

    /// Park `name` for deletion and return the id to confirm it with.
    pub fn create(
        &self,
        session: &Session,
        view: Arc<DirectoryView>,
        name: &str,
    ) -> Result<Uuid, AppError> {
        let workflow = DeleteWorkflow::new(view);
        workflow.request_delete(session, name)?;
        let owner = session
            .require_identity(ADMIN_REQUIRED_MESSAGE)?
            .uid
            .clone();

        let id = Uuid::new_v4();
        let mut pending = self.lock();
        self.purge_expired(&mut pending);
        pending.insert(
            id,
            PendingDelete {
                owner,
                workflow,
                created_at: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Remove the request if it exists, is live and belongs to `session`.
    fn take(&self, id: Uuid, session: &Session) -> Result<DeleteWorkflow, AppError> {
        let uid = session
            .identity()
            .map(|i| i.uid.as_str())
            .ok_or_else(|| AppError::Unauthenticated(ADMIN_REQUIRED_MESSAGE.to_string()))?;

        let mut pending = self.lock();
        self.purge_expired(&mut pending);
        match pending.get(&id) {
            Some(p) if p.owner == uid => {}
            _ => return Err(AppError::InvalidInput(UNKNOWN_REQUEST_MESSAGE.to_string())),
        }
        pending
            .remove(&id)
            .map(|p| p.workflow)
            .ok_or_else(|| AppError::InvalidInput(UNKNOWN_REQUEST_MESSAGE.to_string()))
    }

    /// Perform the delete, then refresh the category listing.
    pub async fn confirm(&self, id: Uuid, session: &Session) -> Result<DeleteOutcome, AppError> {
        if !session.is_admin() {
            return Err(AppError::Forbidden(ADMIN_REQUIRED_MESSAGE.to_string()));
        }
        let workflow = self.take(id, session)?;
        workflow.confirm(session).await
    }

    /// Drop the request without touching storage. Returns the file name it held.
    pub fn cancel(&self, id: Uuid, session: &Session) -> Result<Option<String>, AppError> {
        let workflow = self.take(id, session)?;
        Ok(workflow.cancel())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
