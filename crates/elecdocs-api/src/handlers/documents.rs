use crate::auth::CurrentSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::resolve_category;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use elecdocs_core::Document;
use std::sync::Arc;

/// Fresh listing of a category folder.
#[utoipa::path(
    get,
    path = "/api/v0/categories/{category}/documents",
    tag = "documents",
    params(("category" = String, Path, description = "Category id (e.g. SWL) or folder")),
    responses(
        (status = 200, description = "Documents in backend order", body = Vec<Document>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "list_documents"))]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(category): Path<String>,
) -> Result<Json<Vec<Document>>, HttpAppError> {
    let category = resolve_category(&state, &category)?;
    let outcome = state.view(category).refresh(&session).await?;
    Ok(Json(outcome.into_documents()))
}

/// Image documents of a category, for the photo gallery.
#[utoipa::path(
    get,
    path = "/api/v0/categories/{category}/gallery",
    tag = "documents",
    params(("category" = String, Path, description = "Category id or folder")),
    responses(
        (status = 200, description = "Image documents only", body = Vec<Document>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 502, description = "Storage backend failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(operation = "gallery"))]
pub async fn gallery(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(category): Path<String>,
) -> Result<Json<Vec<Document>>, HttpAppError> {
    let category = resolve_category(&state, &category)?;
    Ok(Json(state.directory.gallery(&session, category).await?))
}
