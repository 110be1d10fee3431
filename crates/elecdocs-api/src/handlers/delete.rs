//! Two-step delete: create a request, then confirm or cancel it.

use crate::auth::CurrentSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::resolve_category;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use elecdocs_core::Document;
use elecdocs_services::DeleteOutcome;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRequestResponse {
    pub request_id: Uuid,
    pub name: String,
    /// Confirmation text to show before confirming
    pub prompt: String,
}

/// Result of a confirmed delete. The file is gone in both cases; `documents`
/// is absent when the follow-up listing failed.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteConfirmResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
}

impl From<DeleteOutcome> for DeleteConfirmResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        match outcome {
            DeleteOutcome::Refreshed { documents } => Self {
                documents: Some(documents),
                refresh_error: None,
            },
            DeleteOutcome::RefreshFailed { message } => Self {
                documents: None,
                refresh_error: Some(message),
            },
        }
    }
}

pub fn confirmation_prompt(name: &str) -> String {
    format!(
        "Are you sure you want to delete \"{}\"? This action cannot be undone.",
        name
    )
}

/// Select a file for deletion. Nothing is removed until the request is confirmed.
#[utoipa::path(
    post,
    path = "/api/v0/categories/{category}/documents/{name}/delete-request",
    tag = "delete",
    params(
        ("category" = String, Path, description = "Category id or folder"),
        ("name" = String, Path, description = "File name within the category")
    ),
    responses(
        (status = 201, description = "Awaiting confirmation", body = DeleteRequestResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "delete_request"))]
pub async fn create_delete_request(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path((category, name)): Path<(String, String)>,
) -> Result<(StatusCode, Json<DeleteRequestResponse>), HttpAppError> {
    let category = resolve_category(&state, &category)?;
    let request_id = state
        .delete_requests
        .create(&session, state.view(category), &name)?;

    Ok((
        StatusCode::CREATED,
        Json(DeleteRequestResponse {
            request_id,
            prompt: confirmation_prompt(&name),
            name,
        }),
    ))
}

/// Delete the requested file and return the refreshed listing of its category.
/// A listing failure after the delete is reported in `refresh_error`.
#[utoipa::path(
    post,
    path = "/api/v0/delete-requests/{id}/confirm",
    tag = "delete",
    params(("id" = Uuid, Path, description = "Delete request id")),
    responses(
        (status = 200, description = "Deleted; refreshed listing or refresh error", body = DeleteConfirmResponse),
        (status = 400, description = "Unknown or expired request", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "File no longer exists", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "delete_confirm"))]
pub async fn confirm_delete_request(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteConfirmResponse>, HttpAppError> {
    let outcome = state.delete_requests.confirm(id, &session).await?;
    Ok(Json(outcome.into()))
}

/// Abandon a delete request. Storage is not touched.
#[utoipa::path(
    delete,
    path = "/api/v0/delete-requests/{id}",
    tag = "delete",
    params(("id" = Uuid, Path, description = "Delete request id")),
    responses(
        (status = 204, description = "Cancelled"),
        (status = 400, description = "Unknown or expired request", body = ErrorResponse)
    )
)]
pub async fn cancel_delete_request(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    let name = state.delete_requests.cancel(id, &session)?;
    tracing::debug!(request_id = %id, name = ?name, "Delete request cancelled");
    Ok(StatusCode::NO_CONTENT)
}
