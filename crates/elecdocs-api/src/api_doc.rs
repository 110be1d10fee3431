//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use elecdocs_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "elecdocs API",
        version = "0.1.0",
        description = "Electrical documentation viewer. Lists, uploads and deletes the documents of each installation category. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::session::get_session,
        handlers::categories::list_categories,
        handlers::documents::list_documents,
        handlers::documents::gallery,
        handlers::upload::upload_document,
        handlers::delete::create_delete_request,
        handlers::delete::confirm_delete_request,
        handlers::delete::cancel_delete_request,
    ),
    components(schemas(
        models::Document,
        models::DocumentKind,
        elecdocs_core::Category,
        error::ErrorResponse,
        handlers::session::SessionResponse,
        handlers::categories::CategoryDescriptor,
        handlers::delete::DeleteRequestResponse,
        handlers::delete::DeleteConfirmResponse,
    )),
    tags(
        (name = "session", description = "Current identity"),
        (name = "categories", description = "Document categories"),
        (name = "documents", description = "Listing and upload"),
        (name = "delete", description = "Two-step, administrator-only delete")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
