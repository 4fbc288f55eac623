//! Google Drive v3 adapter
//!
//! Talks to the REST API directly with a bearer access token. Obtaining and
//! refreshing the token is left to the user (see `notefiler config`); an
//! expired token surfaces as [`RemoteErrorKind::AuthExpired`].

use super::error::{RemoteErrorKind, RemoteStoreError};
use super::remote::{EntryKind, RemoteStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const DRIVE_ROOT_ALIAS: &str = "root";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Access token accepted from `token.json`-style files
#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(alias = "token")]
    access_token: String,
}

pub struct DriveStore {
    client: Client,
    api_base: String,
    access_token: String,
}

impl DriveStore {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self, RemoteStoreError> {
        Self::with_api_base(access_token, timeout, DEFAULT_API_BASE)
    }

    /// Points the adapter at another endpoint, e.g. a local emulator
    pub fn with_api_base(
        access_token: impl Into<String>,
        timeout: Duration,
        api_base: impl Into<String>,
    ) -> Result<Self, RemoteStoreError> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(RemoteStoreError::auth_expired("no Google Drive access token configured"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteStoreError::fatal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Reads an access token from a JSON file with an `access_token` or `token` field
    pub fn read_token_file(path: &Path) -> Result<String, RemoteStoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RemoteStoreError::auth_expired(format!("cannot read token file {}: {}", path.display(), e))
        })?;
        let parsed: TokenFile = serde_json::from_str(&raw).map_err(|e| {
            RemoteStoreError::auth_expired(format!("invalid token file {}: {}", path.display(), e))
        })?;
        Ok(parsed.access_token)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RemoteStoreError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_status(status, &body))
    }
}

#[async_trait]
impl RemoteStore for DriveStore {
    async fn find_child(
        &self,
        parent_id: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<Option<String>, RemoteStoreError> {
        let query = build_child_query(parent_id, name, kind);
        debug!(parent = parent_id, name, "Drive lookup");

        let request = self
            .client
            .get(format!("{}/drive/v3/files", self.api_base))
            .query(&[
                ("q", query.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id)"),
                ("orderBy", "createdTime"),
                ("pageSize", "10"),
            ]);

        let list: FileList = read_json(self.execute(request).await?, "file list").await?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<String, RemoteStoreError> {
        debug!(parent = parent_id, name, "Drive create folder");

        let request = self
            .client
            .post(format!("{}/drive/v3/files", self.api_base))
            .query(&[("fields", "id")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }));

        let file: DriveFile = read_json(self.execute(request).await?, "create response").await?;

        Ok(file.id)
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        local_path: &Path,
        name: &str,
        mime_type: &str,
    ) -> Result<String, RemoteStoreError> {
        let content = tokio::fs::read(local_path).await.map_err(|e| {
            RemoteStoreError::fatal(format!("cannot read {}: {}", local_path.display(), e))
        })?;
        debug!(parent = parent_id, name, bytes = content.len(), "Drive upload");

        let metadata = serde_json::json!({ "name": name, "parents": [parent_id] });
        let boundary = new_boundary();
        let body = build_multipart_body(&boundary, &metadata, mime_type, &content);

        let request = self
            .client
            .post(format!("{}/upload/drive/v3/files", self.api_base))
            .query(&[("uploadType", "multipart"), ("fields", "id")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body);

        let file: DriveFile = read_json(self.execute(request).await?, "upload response").await?;

        Ok(file.id)
    }

    fn default_root(&self) -> String {
        DRIVE_ROOT_ALIAS.to_string()
    }

    fn name(&self) -> &str {
        "google-drive"
    }
}

impl std::fmt::Debug for DriveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveStore")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn build_child_query(parent_id: &str, name: &str, kind: EntryKind) -> String {
    let mut query = format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_query_literal(name),
        escape_query_literal(parent_id)
    );
    match kind {
        EntryKind::Folder => query.push_str(&format!(" and mimeType = '{}'", FOLDER_MIME_TYPE)),
        EntryKind::File => query.push_str(&format!(" and mimeType != '{}'", FOLDER_MIME_TYPE)),
        EntryKind::Any => {}
    }
    query
}

/// Fresh boundary per upload so file bytes cannot contain it by accident
fn new_boundary() -> String {
    format!("notefiler-{}", Uuid::new_v4().simple())
}

fn build_multipart_body(
    boundary: &str,
    metadata: &serde_json::Value,
    mime_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Reads a success body. A body cut off in transit is transient; only a
/// complete body that does not parse is fatal.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, RemoteStoreError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RemoteStoreError::transient(format!("{} interrupted: {}", what, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RemoteStoreError::fatal(format!("malformed {}: {}", what, e)))
}

fn map_transport_error(error: reqwest::Error) -> RemoteStoreError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        RemoteStoreError::transient(error.to_string())
    } else {
        RemoteStoreError::fatal(error.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> RemoteStoreError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|p| p.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let rate_limited_reason = parsed.as_ref().is_some_and(|p| {
        p.error
            .errors
            .iter()
            .any(|d| d.reason == "rateLimitExceeded" || d.reason == "userRateLimitExceeded")
    });

    let kind = match status {
        StatusCode::UNAUTHORIZED => RemoteErrorKind::AuthExpired,
        StatusCode::TOO_MANY_REQUESTS => RemoteErrorKind::RateLimited,
        StatusCode::FORBIDDEN if rate_limited_reason => RemoteErrorKind::RateLimited,
        StatusCode::NOT_FOUND => RemoteErrorKind::NotFound,
        StatusCode::REQUEST_TIMEOUT => RemoteErrorKind::Transient,
        s if s.is_server_error() => RemoteErrorKind::Transient,
        _ => RemoteErrorKind::Fatal,
    };

    RemoteStoreError::new(kind, message)
}
