//! Error types module
//!
//! All failures of the directory, upload and delete workflows are unified under
//! [`AppError`]. Backend failures carry the [`Operation`] they interrupted so
//! that each operation surfaces exactly one generic, human-readable message,
//! while validation failures carry the specific constraint the user violated.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use crate::constants::MAX_UPLOAD_BYTES;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "BACKEND_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether the user may simply re-trigger the action
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// User-facing operation an error interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListDocuments,
    Upload,
    Delete,
}

impl Operation {
    /// The single generic message shown for any backend failure of this operation.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::ListDocuments => "Error loading files. Please try again later.",
            Operation::Upload => "Failed to upload file. Please try again.",
            Operation::Delete => "Failed to delete file. Please try again.",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Operation::ListDocuments => write!(f, "list_documents"),
            Operation::Upload => write!(f, "upload"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// A user-correctable upload constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("File size exceeds 15 MB limit. Current size: {:.1} MB", mebibytes(.size))]
    TooLarge { size: u64 },

    #[error("Only image files are allowed in the Photos folder")]
    NotAnImage { content_type: String },

    #[error("Only PDF files are allowed in this folder")]
    NotAPdf { content_type: String },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}

impl ValidationFailure {
    pub fn limit_bytes() -> u64 {
        MAX_UPLOAD_BYTES
    }
}

fn mebibytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationFailure),

    #[error("Backend unavailable during {operation}: {message}")]
    BackendUnavailable { operation: Operation, message: String },

    #[error("Not found during {operation}: {message}")]
    NotFound { operation: Operation, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn backend(operation: Operation, message: impl Into<String>) -> Self {
        AppError::BackendUnavailable {
            operation,
            message: message.into(),
        }
    }

    pub fn not_found(operation: Operation, message: impl Into<String>) -> Self {
        AppError::NotFound {
            operation,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Unauthenticated(_) => (
            401,
            "UNAUTHENTICATED",
            false,
            Some("Sign in and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Ask an administrator to perform this action"),
            false,
            LogLevel::Debug,
        ),
        AppError::ValidationFailed(ValidationFailure::TooLarge { .. }) => (
            413,
            "FILE_TOO_LARGE",
            false,
            Some("Choose a file of at most 15 MB"),
            false,
            LogLevel::Debug,
        ),
        AppError::ValidationFailed(_) => (
            400,
            "VALIDATION_FAILED",
            false,
            Some("Choose a file of the type this category accepts"),
            false,
            LogLevel::Debug,
        ),
        AppError::BackendUnavailable { .. } => (
            502,
            "BACKEND_UNAVAILABLE",
            true,
            Some("Try the action again"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound { .. } => (
            404,
            "NOT_FOUND",
            false,
            Some("Refresh the file list"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Configuration(_) => (
            500,
            "CONFIGURATION_ERROR",
            false,
            Some("Contact the administrator"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Forbidden(_) => "Forbidden",
            AppError::ValidationFailed(_) => "ValidationFailed",
            AppError::BackendUnavailable { .. } => "BackendUnavailable",
            AppError::NotFound { .. } => "NotFound",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Configuration(_) => "Configuration",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Unauthenticated(ref msg) => msg.clone(),
            AppError::Forbidden(ref msg) => msg.clone(),
            AppError::ValidationFailed(ref failure) => failure.to_string(),
            AppError::BackendUnavailable { operation, .. } => {
                operation.failure_message().to_string()
            }
            AppError::NotFound { operation, .. } => operation.failure_message().to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Configuration(_) => "Server misconfiguration".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
