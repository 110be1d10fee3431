use crate::auth::CurrentSession;
use crate::error::{ErrorResponse, HttpAppError};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_admin: bool,
}

/// Who the bearer token identifies, and whether they may delete files.
#[utoipa::path(
    get,
    path = "/api/v0/session",
    tag = "session",
    responses(
        (status = 200, description = "Current identity", body = SessionResponse),
        (status = 401, description = "No or invalid token", body = ErrorResponse)
    )
)]
pub async fn get_session(
    CurrentSession(session): CurrentSession,
) -> Result<Json<SessionResponse>, HttpAppError> {
    let identity = session.require_identity("Please log in")?;
    Ok(Json(SessionResponse {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        is_admin: session.is_admin(),
    }))
}
