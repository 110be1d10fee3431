//! HTTP client for the elecdocs API.
//!
//! Bearer-token auth, JSON helpers, and the upload call that follows the
//! server's NDJSON event stream.

use anyhow::{Context, Result};
use bytes::Bytes;
use elecdocs_core::constants::{API_PREFIX, DEFAULT_CONTENT_TYPE};
use elecdocs_core::Document;
use elecdocs_services::UploadEvent;
use futures::{Stream, StreamExt};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use uuid::Uuid;

/// Longest accepted event line. A `refreshed` event carries a whole listing.
const MAX_EVENT_LINE_BYTES: usize = 16 * 1024 * 1024;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInfo {
    pub id: String,
    pub label: String,
    pub folder: String,
    pub accept: String,
    pub is_photo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    pub request_id: Uuid,
    pub name: String,
    pub prompt: String,
}

/// Outcome of a confirmed delete. `documents` is absent when the server could
/// not re-list the folder afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteConfirmation {
    #[serde(default)]
    pub documents: Option<Vec<Document>>,
    #[serde(default)]
    pub refresh_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .context("Failed to send request")?;
        check_status(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.client.get(self.build_url(path))).await?;
        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    pub async fn session(&self) -> Result<SessionInfo> {
        self.get("/session").await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryInfo>> {
        self.get("/categories").await
    }

    pub async fn list_documents(&self, category: &str) -> Result<Vec<Document>> {
        self.get(&format!("/categories/{}/documents", encode_segment(category)))
            .await
    }

    /// Upload `path` into `category`, calling `on_event` for every event the
    /// server streams back. Returns the final event.
    pub async fn upload(
        &self,
        category: &str,
        path: &Path,
        mut on_event: impl FnMut(&UploadEvent),
    ) -> Result<UploadEvent> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("File path has no usable file name")?
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let content_type = content_type_for(path);
        tracing::debug!(file = %file_name, size_bytes = data.len(), content_type = %content_type, "Uploading");

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(&content_type)
            .context("Invalid content type")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = self.build_url(&format!("/categories/{}/documents", encode_segment(category)));
        let response = self.send(self.client.post(url).multipart(form)).await?;

        let mut events = std::pin::pin!(decode_events(response.bytes_stream()));
        let mut last: Option<UploadEvent> = None;
        while let Some(event) = events.next().await {
            let event = event?;
            on_event(&event);
            last = Some(event);
        }

        last.context("Server closed the upload stream without an outcome")
    }

    /// Save the file `name` of `category` to `output`, following the signed
    /// retrieval URL from a fresh listing. Returns the number of bytes written.
    pub async fn download(&self, category: &str, name: &str, output: &Path) -> Result<u64> {
        let documents = self.list_documents(category).await?;
        let document = documents
            .iter()
            .find(|d| d.name == name)
            .with_context(|| format!("No file named \"{}\" in {}", name, category))?;

        // Signed URLs carry their own authorization.
        let response = self
            .client
            .get(&document.url)
            .send()
            .await
            .context("Failed to send request")?;
        let response = check_status(response).await?;

        let mut file = tokio::fs::File::create(output)
            .await
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let reader = StreamReader::new(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );
        let mut reader = std::pin::pin!(reader);
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .context("Download interrupted")?;
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::debug!(file = %name, size_bytes = written, "Downloaded");
        Ok(written)
    }

    pub async fn request_delete(&self, category: &str, name: &str) -> Result<DeleteRequest> {
        let url = self.build_url(&format!(
            "/categories/{}/documents/{}/delete-request",
            encode_segment(category),
            encode_segment(name)
        ));
        let response = self.send(self.client.post(url)).await?;
        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    pub async fn confirm_delete(&self, request_id: Uuid) -> Result<DeleteConfirmation> {
        let url = self.build_url(&format!("/delete-requests/{}/confirm", request_id));
        let response = self.send(self.client.post(url)).await?;
        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    pub async fn cancel_delete(&self, request_id: Uuid) -> Result<()> {
        let url = self.build_url(&format!("/delete-requests/{}", request_id));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

/// Turn a non-success response into an error carrying the server's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow::anyhow!("{}", error_message(status.as_u16(), &text)))
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => format!("{} (HTTP {})", parsed.error, status),
        Err(_) if body.trim().is_empty() => format!("Request failed with HTTP {}", status),
        Err(_) => format!("Request failed with HTTP {}: {}", status, body.trim()),
    }
}

/// Decode a chunked NDJSON body into upload events, skipping blank lines.
pub fn decode_events<S, E>(body: S) -> impl Stream<Item = Result<UploadEvent>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let reader = StreamReader::new(body.map(|chunk| chunk.map_err(std::io::Error::other)));
    FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_EVENT_LINE_BYTES)).filter_map(
        |line| async move {
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(
                    serde_json::from_str::<UploadEvent>(&line)
                        .context("Malformed upload event from server"),
                ),
                Err(e) => Some(Err(anyhow::Error::new(e).context("Upload response interrupted"))),
            }
        },
    )
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Guess the MIME type the server will validate against.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}
