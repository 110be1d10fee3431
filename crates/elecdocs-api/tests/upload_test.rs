//! Upload and file retrieval integration tests.
//!
//! Run with: `cargo test -p elecdocs-api --test upload_test`

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use helpers::auth::technician_token;
use helpers::{api_path, setup_test_app, BASE_URL};
use serde_json::Value;

fn file_form(name: &str, mime: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(data).file_name(name).mime_type(mime))
}

fn ndjson_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("event line is JSON"))
        .collect()
}

/// Fetch a retrieval URL returned in a listing through the test server.
async fn fetch_url(client: &TestServer, url: &str) -> axum_test::TestResponse {
    let relative = url.strip_prefix(BASE_URL).expect("URL served by this API");
    let (path, query) = relative.split_once('?').expect("signed URL has a query");
    let token = query.strip_prefix("token=").expect("token parameter");
    client.get(path).add_query_param("token", token).await
}

#[tokio::test]
async fn test_upload_streams_progress_then_refreshed_listing() {
    let app = setup_test_app().await;
    let client = app.client();
    let data = vec![7u8; 600 * 1024];

    let response = client
        .post(&api_path("/categories/SWL/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("main-board.pdf", "application/pdf", data.clone()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").map(|v| v.as_bytes()),
        Some(&b"application/x-ndjson"[..])
    );

    let events = ndjson_events(&response.text());
    let progress: Vec<u64> = events
        .iter()
        .filter(|e| e["event"] == "progress")
        .map(|e| e["percent"].as_u64().unwrap())
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));

    let tail: Vec<_> = events.iter().filter(|e| e["event"] != "progress").collect();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0]["event"], "completed");
    assert_eq!(tail[1]["event"], "refreshed");
    let documents = tail[1]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["name"], "main-board.pdf");
    assert_eq!(documents[0]["size"], data.len() as u64);

    let stored = std::fs::read(app.storage_root().join("swl/main-board.pdf")).unwrap();
    assert_eq!(stored, data);
}

#[tokio::test]
async fn test_unauthenticated_upload_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/categories/SWL/documents"))
        .multipart(file_form("a.pdf", "application/pdf", b"%PDF".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "Please log in to upload files");
    assert!(!app.storage_root().join("swl").exists());
}

#[tokio::test]
async fn test_type_rules_per_category() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/categories/Photos/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("plan.pdf", "application/pdf", b"%PDF".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Only image files are allowed in the Photos folder"
    );

    let response = client
        .post(&api_path("/categories/PRS/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("site.png", "image/png", b"\x89PNG".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Only PDF files are allowed in this folder"
    );

    let response = client
        .post(&api_path("/categories/Photos/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("site.png", "image/png", b"\x89PNG".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(ndjson_events(&response.text())
        .iter()
        .any(|e| e["event"] == "completed"));
}

#[tokio::test]
async fn test_oversized_file_is_rejected_with_size() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/categories/CAS/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form(
            "schedule.pdf",
            "application/pdf",
            vec![0u8; 16 * 1024 * 1024],
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = response.json::<Value>();
    assert_eq!(
        body["error"],
        "File size exceeds 15 MB limit. Current size: 16.0 MB"
    );
    assert_eq!(body["code"], "FILE_TOO_LARGE");
    assert!(!app.storage_root().join("cas").exists());
}

#[tokio::test]
async fn test_far_oversized_file_still_reports_its_size() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/categories/WID/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form(
            "site-survey.pdf",
            "application/pdf",
            vec![0u8; 40 * 1024 * 1024],
        ))
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.json::<Value>()["error"],
        "File size exceeds 15 MB limit. Current size: 40.0 MB"
    );
    assert!(!app.storage_root().join("wid").exists());
}

#[tokio::test]
async fn test_dotted_file_name_is_stored_as_is() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/categories/SWL/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("Main board rev..2.pdf", "application/pdf", b"%PDF".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(app.storage_root().join("swl/Main board rev..2.pdf").exists());
}

#[tokio::test]
async fn test_file_names_cannot_escape_folder() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post(&api_path("/categories/SWL/documents"))
        .authorization_bearer(technician_token())
        .multipart(file_form("..", "application/pdf", b"%PDF".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_url_serves_file_and_rejects_tampering() {
    let app = setup_test_app().await;
    let client = app.client();
    app.seed("inz", "zones.pdf", b"%PDF-1.7 zones");
    app.seed("inz", "other.pdf", b"%PDF-1.7 other");

    let documents = client
        .get(&api_path("/categories/INZ/documents"))
        .authorization_bearer(technician_token())
        .await
        .json::<Vec<Value>>();
    let zones = documents.iter().find(|d| d["name"] == "zones.pdf").unwrap();
    let url = zones["url"].as_str().unwrap();

    let response = fetch_url(client, url).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(&response.as_bytes()[..], b"%PDF-1.7 zones");
    assert_eq!(
        response.headers().get("content-type").map(|v| v.as_bytes()),
        Some(&b"application/pdf"[..])
    );

    // The same token does not open a different file.
    let tampered = url.replace("zones.pdf", "other.pdf");
    let response = fetch_url(client, &tampered).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = client.get("/files/inz/zones.pdf").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
