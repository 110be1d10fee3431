//! Session, category and listing integration tests.
//!
//! Run with: `cargo test -p elecdocs-api --test documents_test`

mod helpers;

use axum::http::StatusCode;
use helpers::auth::{admin_token, expired_token, technician_token};
use helpers::{api_path, setup_test_app};
use serde_json::Value;

#[tokio::test]
async fn test_health_checks() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get(&api_path("/health/live")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "alive");

    let response = client.get(&api_path("/health/ready")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["storage"], "ready");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get(&api_path("/health/live"))
        .add_header("x-request-id", "req-1234")
        .await;
    assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(&b"req-1234"[..])
    );
    assert!(response.headers().contains_key("x-content-type-options"));
}

#[tokio::test]
async fn test_session_reports_admin_flag() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client.get(&api_path("/session")).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&api_path("/session"))
        .authorization_bearer(technician_token())
        .await;
    let body = response.json::<Value>();
    assert_eq!(body["uid"], "tech-1");
    assert_eq!(body["is_admin"], false);

    let response = client
        .get(&api_path("/session"))
        .authorization_bearer(admin_token())
        .await;
    assert_eq!(response.json::<Value>()["is_admin"], true);
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .get(&api_path("/categories/SWL/documents"))
        .authorization_bearer("not-a-token")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(&api_path("/categories/SWL/documents"))
        .authorization_bearer(expired_token("tech-1", "tech@example.com"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Token has expired");
}

#[tokio::test]
async fn test_categories_cover_the_fixed_set() {
    let app = setup_test_app().await;
    let response = app.client().get(&api_path("/categories")).await;
    let categories = response.json::<Vec<Value>>();

    assert_eq!(categories.len(), 8);
    let photos = categories
        .iter()
        .find(|c| c["id"] == "Photos")
        .expect("Photos category");
    assert_eq!(photos["folder"], "img");
    assert_eq!(photos["accept"], "image/*");
    let swl = categories.iter().find(|c| c["id"] == "SWL").expect("SWL");
    assert_eq!(swl["accept"], "application/pdf");
}

#[tokio::test]
async fn test_anonymous_listing_asks_to_log_in() {
    let app = setup_test_app().await;
    app.seed("swl", "board.pdf", b"%PDF-1.4");

    let response = app.client().get(&api_path("/categories/SWL/documents")).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Please log in to view files");
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_listing_describes_documents() {
    let app = setup_test_app().await;
    app.seed("wid", "panel-a.pdf", b"%PDF-1.4 panel a");
    app.seed("wid", "panel-b.pdf", b"%PDF-1.4 b");

    let response = app
        .client()
        .get(&api_path("/categories/WID/documents"))
        .authorization_bearer(technician_token())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let documents = response.json::<Vec<Value>>();
    let names: Vec<_> = documents.iter().map(|d| d["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["panel-a.pdf", "panel-b.pdf"]);
    assert_eq!(documents[0]["type"], "application/pdf");
    assert_eq!(documents[0]["size"], 16);
    assert!(documents[0]["lastModified"].is_string());
    assert!(documents[0]["url"]
        .as_str()
        .unwrap()
        .starts_with("http://localhost:4000/files/wid/panel-a.pdf?token="));
}

#[tokio::test]
async fn test_category_can_be_addressed_by_folder() {
    let app = setup_test_app().await;
    app.seed("car", "route.pdf", b"%PDF");

    let response = app
        .client()
        .get(&api_path("/categories/car/documents"))
        .authorization_bearer(technician_token())
        .await;
    assert_eq!(response.json::<Vec<Value>>().len(), 1);
}

#[tokio::test]
async fn test_empty_and_unknown_categories() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .get(&api_path("/categories/ICT/documents"))
        .authorization_bearer(technician_token())
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Vec<Value>>().is_empty());

    let response = client
        .get(&api_path("/categories/HVAC/documents"))
        .authorization_bearer(technician_token())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gallery_only_returns_images() {
    let app = setup_test_app().await;
    app.seed("img", "site.jpg", b"\xff\xd8\xff");
    app.seed("img", "notes.txt", b"notes");
    app.seed("img", "meter.png", b"\x89PNG");

    let response = app
        .client()
        .get(&api_path("/categories/Photos/gallery"))
        .authorization_bearer(technician_token())
        .await;
    let documents = response.json::<Vec<Value>>();
    let mut names: Vec<_> = documents.iter().map(|d| d["name"].as_str().unwrap()).collect();
    names.sort();
    assert_eq!(names, vec!["meter.png", "site.jpg"]);
}

#[tokio::test]
async fn test_openapi_spec_is_served() {
    let app = setup_test_app().await;
    let response = app.client().get("/api/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>()["paths"]
        .get("/api/v0/categories/{category}/documents")
        .is_some());
}
