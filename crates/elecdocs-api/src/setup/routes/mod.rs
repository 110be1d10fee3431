//! Route configuration and setup.

mod health;

use crate::auth::middleware::auth_middleware;
use crate::handlers;
use crate::middleware::{
    request_id_middleware, security_headers_middleware, RequestId, SecurityHeadersConfig,
};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Request},
    routing::{delete, get, post},
    Json, Router,
};
use elecdocs_core::constants::API_PREFIX;
use elecdocs_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// In-flight request cap. Each upload buffers up to one full body in memory.
const HTTP_CONCURRENCY_LIMIT: usize = 64;

pub fn setup_routes(state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(&state.config)?;
    let security_headers_config = Arc::new(SecurityHeadersConfig::new(
        state.config.is_production(),
    ));

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.as_str())
            .unwrap_or_default();
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri().path(),
            request_id = %request_id,
        )
    });

    let api_routes = api_routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let app = Router::new()
        .merge(api_routes)
        .merge(public_routes())
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        // The upload handler bounds what it buffers itself.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(trace_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/session", API_PREFIX),
            get(handlers::session::get_session),
        )
        .route(
            &format!("{}/categories", API_PREFIX),
            get(handlers::categories::list_categories),
        )
        .route(
            &format!("{}/categories/{{category}}/documents", API_PREFIX),
            get(handlers::documents::list_documents).post(handlers::upload::upload_document),
        )
        .route(
            &format!("{}/categories/{{category}}/gallery", API_PREFIX),
            get(handlers::documents::gallery),
        )
        .route(
            &format!(
                "{}/categories/{{category}}/documents/{{name}}/delete-request",
                API_PREFIX
            ),
            post(handlers::delete::create_delete_request),
        )
        .route(
            &format!("{}/delete-requests/{{id}}/confirm", API_PREFIX),
            post(handlers::delete::confirm_delete_request),
        )
        .route(
            &format!("{}/delete-requests/{{id}}", API_PREFIX),
            delete(handlers::delete::cancel_delete_request),
        )
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/health/live", API_PREFIX),
            get(health::liveness_check),
        )
        .route(
            &format!("{}/health/ready", API_PREFIX),
            get(health::readiness_check),
        )
        .route("/files/{*key}", get(handlers::files::get_file))
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
