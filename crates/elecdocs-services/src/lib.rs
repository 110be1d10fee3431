//! elecdocs services
//!
//! The document workflows that sit between a caller's session and the storage
//! backend: listing a category, uploading into it and deleting from it.

pub mod delete;
pub mod directory;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use delete::{DeleteOutcome, DeletePhase, DeleteWorkflow};
pub use directory::{DirectoryService, DirectoryView, RefreshOutcome};
pub use session::{AdminAllowList, AuthEvent, Session, SessionContext, SessionSubscription};
pub use upload::{FileUpload, UploadEvent, UploadWorkflow};
