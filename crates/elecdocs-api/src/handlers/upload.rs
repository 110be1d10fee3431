//! Multipart upload answered with an NDJSON stream of upload events.

use crate::auth::CurrentSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::resolve_category;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use bytes::{Bytes, BytesMut};
use elecdocs_core::constants::{DEFAULT_CONTENT_TYPE, MAX_UPLOAD_BYTES};
use elecdocs_core::{AppError, ValidationFailure};
use elecdocs_services::upload::UPLOAD_LOGIN_REQUIRED_MESSAGE;
use elecdocs_services::{FileUpload, UploadEvent};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Read the single `file` field of a multipart body.
///
/// At most `MAX_UPLOAD_BYTES` are buffered. Once a file passes that, reading
/// stops and the size is taken from the request's `Content-Length`, or from the
/// rest of the field counted without buffering when no length was declared.
async fn read_file_field(
    mut multipart: Multipart,
    declared_len: Option<u64>,
) -> Result<FileUpload, HttpAppError> {
    let mut upload: Option<FileUpload> = None;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if upload.is_some() {
            return Err(AppError::InvalidInput(
                "Send exactly one field named 'file'".to_string(),
            )
            .into());
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > MAX_UPLOAD_BYTES {
                let size = match declared_len {
                    Some(len) => len.max(data.len() as u64),
                    None => data.len() as u64 + count_remaining(&mut field).await?,
                };
                return Err(AppError::from(ValidationFailure::TooLarge { size }).into());
            }
        }
        upload = Some(FileUpload {
            file_name,
            content_type,
            data: data.freeze(),
        });
    }

    upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()).into())
}

async fn count_remaining(field: &mut Field<'_>) -> Result<u64, HttpAppError> {
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
    }
    Ok(size)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn event_line(event: &UploadEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

fn ndjson_body(events: mpsc::Receiver<UploadEvent>) -> Body {
    let stream = futures::stream::unfold(events, |mut events| async move {
        events.recv().await.map(|event| (event, events))
    })
    .map(|event| event_line(&event));
    Body::from_stream(stream)
}

/// Validate and store one file. Validation failures are plain JSON errors;
/// once accepted, transfer progress and the outcome stream back as NDJSON.
#[utoipa::path(
    post,
    path = "/api/v0/categories/{category}/documents",
    tag = "documents",
    params(("category" = String, Path, description = "Category id or folder")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload accepted; one JSON upload event per line", body = String, content_type = "application/x-ndjson"),
        (status = 400, description = "Wrong file type or name", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 413, description = "File exceeds 15 MB", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session, headers, multipart), fields(operation = "upload"))]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    Path(category): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    session.require_identity(UPLOAD_LOGIN_REQUIRED_MESSAGE)?;
    let category = resolve_category(&state, &category)?;

    let file = read_file_field(multipart, content_length(&headers)).await?;
    let events = state.uploads.start(&session, state.view(category), file)?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-store")
        .body(ndjson_body(events))
        .map_err(|e| HttpAppError(AppError::Internal(e.to_string())))
}
