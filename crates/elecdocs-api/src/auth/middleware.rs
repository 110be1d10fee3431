use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use elecdocs_core::AppError;
use elecdocs_services::Session;
use std::sync::Arc;

/// Resolve the request's [`Session`] and store it in request extensions.
///
/// No `Authorization` header means an anonymous session. A header that is
/// present but malformed, or a token that fails verification, is a 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|h| h.to_str().map(str::to_string));

    let session = match header {
        None => Session::anonymous(),
        Some(Err(_)) => {
            return HttpAppError(AppError::Unauthenticated(
                "Invalid authorization header".to_string(),
            ))
            .into_response();
        }
        Some(Ok(value)) => {
            let Some(token) = value.strip_prefix("Bearer ") else {
                return HttpAppError(AppError::Unauthenticated(
                    "Invalid authorization header format".to_string(),
                ))
                .into_response();
            };

            match state.authenticator.validate_token(token.trim()).await {
                Ok(claims) => {
                    let session = Session::signed_in(claims.identity(), &state.admins);
                    tracing::debug!(
                        user_id = %claims.sub,
                        is_admin = session.is_admin(),
                        "Authenticated request"
                    );
                    session
                }
                Err(e) => return HttpAppError(e).into_response(),
            }
        }
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}
