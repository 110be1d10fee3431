//! elecdocs core library
//!
//! Domain types shared by every elecdocs component: the closed category set and
//! its folder registry, the document model, session identities, error types and
//! configuration.

pub mod category;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use category::{Category, CategoryRegistry};
pub use config::{Config, LogFormat};
pub use error::{AppError, ErrorMetadata, LogLevel, Operation, ValidationFailure};
pub use models::{Document, DocumentKind, Identity};
pub use storage_types::StorageBackend;
