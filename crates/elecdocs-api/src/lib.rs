//! elecdocs HTTP API
//!
//! Exposes the directory, upload and delete workflows over HTTP, authenticates
//! bearer tokens from the identity provider and serves local-backend files
//! behind signed URLs.

mod api_doc;
mod handlers;
mod middleware;
mod services;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::DeleteRequests;
