//! Serves local-backend objects behind signed retrieval URLs (no auth; the token
//! proves which object may be read and until when).

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use elecdocs_core::constants::DEFAULT_CONTENT_TYPE;
use elecdocs_core::{AppError, Operation};
use elecdocs_storage::keys::{file_name, is_safe_key};
use elecdocs_storage::ObjectHandle;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub token: String,
}

#[tracing::instrument(skip(state, query), fields(operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, HttpAppError> {
    let signer = state.file_signer.as_ref().ok_or_else(|| {
        AppError::not_found(Operation::ListDocuments, "File serving is disabled")
    })?;

    let token = query.token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidInput("Missing token parameter".to_string()).into());
    }
    if !is_safe_key(&key) {
        return Err(AppError::InvalidInput("Invalid file path".to_string()).into());
    }
    signer.verify(&key, token).map_err(|e| {
        tracing::debug!(error = %e, key = %key, "Rejected file token");
        AppError::Forbidden(e.to_string())
    })?;

    let storage = state.storage();
    let handle = ObjectHandle {
        name: file_name(&key).to_string(),
        key: key.clone(),
    };
    let metadata = storage
        .metadata(&handle)
        .await
        .map_err(|e| e.into_app_error(Operation::ListDocuments))?;
    let stream = storage.download_stream(&key).await.map_err(|e| {
        tracing::error!(error = %e, key = %key, "Failed to open file");
        e.into_app_error(Operation::ListDocuments)
    })?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            metadata.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE),
        )
        .header(header::CONTENT_LENGTH, metadata.size)
        .header(header::CACHE_CONTROL, "private, max-age=300")
        .body(Body::from_stream(body_stream))
        .map_err(|e| HttpAppError(AppError::Internal(e.to_string())))
}
