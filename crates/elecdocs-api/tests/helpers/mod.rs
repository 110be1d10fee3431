//! Test helpers: build the router against a local backend in a temp dir.
//!
//! Run from workspace root: `cargo test -p elecdocs-api`.

#![allow(dead_code)]

pub mod auth;

use axum_test::TestServer;
use elecdocs_api::setup::{build_state, routes};
use elecdocs_api::state::AppState;
use elecdocs_core::constants::API_PREFIX;
use elecdocs_core::Config;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_URL: &str = "http://localhost:4000";
pub const ADMIN_EMAIL: &str = "lead@example.com";
pub const SECOND_ADMIN_EMAIL: &str = "deputy@example.com";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Place a file directly in the backend, bypassing the upload workflow.
    pub fn seed(&self, folder: &str, name: &str, contents: &[u8]) {
        let dir = self.storage_root().join(folder);
        std::fs::create_dir_all(&dir).expect("create folder");
        std::fs::write(dir.join(name), contents).expect("write file");
    }
}

fn test_config(storage_path: &Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("JWT_SECRET", auth::TEST_JWT_SECRET.to_string()),
        (
            "ADMIN_EMAILS",
            format!("{},{}", ADMIN_EMAIL, SECOND_ADMIN_EMAIL),
        ),
        ("STORAGE_BACKEND", "local".to_string()),
        (
            "LOCAL_STORAGE_PATH",
            storage_path.to_string_lossy().into_owned(),
        ),
        ("LOCAL_STORAGE_BASE_URL", format!("{}/files", BASE_URL)),
        (
            "URL_SIGNING_SECRET",
            "url-signing-secret-at-least-32-characters".to_string(),
        ),
    ]);
    let config = Config::from_vars(|key| vars.get(key).cloned()).expect("test config");
    config.validate().expect("valid test config");
    config
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = test_config(temp_dir.path());

    let state = build_state(config).await.expect("Failed to build state");
    let router = routes::setup_routes(state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        temp_dir,
    }
}
