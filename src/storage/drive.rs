//! Google Drive v3 storage backend.
//!
//! Talks to the public REST API with a bearer token from the injected
//! [`TokenProvider`]:
//!
//! | Operation     | Request                                                     |
//! |---------------|-------------------------------------------------------------|
//! | `open_folder` | `GET  /drive/v3/files/{id}`                                 |
//! | `list_page`   | `GET  /drive/v3/files?q='{id}' in parents and trashed=false`|
//! | `get_file`    | `GET  /drive/v3/files/{id}`                                 |
//! | `create_file` | `POST /upload/drive/v3/files?uploadType=multipart`          |
//!
//! Uploads use a `multipart/related` body (JSON metadata part followed by the
//! media part). No `parents` are sent, so new files land in My Drive's root.

use super::{DriveFile, FilePage, Storage};
use crate::auth::TokenProvider;
use crate::error::StorageError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FILE_FIELDS: &str = "id,name,mimeType";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";
const MULTIPART_BOUNDARY: &str = "drive_pdf2img_part_boundary";

/// [`Storage`] backed by the Google Drive v3 API.
pub struct DriveStorage {
    client: reqwest::Client,
    token: Arc<dyn TokenProvider>,
    api_base: String,
    upload_base: String,
    page_size: u32,
}

impl DriveStorage {
    pub fn new(token: Arc<dyn TokenProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), token)
    }

    /// Reuse an existing HTTP client (connection pool, proxy settings).
    pub fn with_client(client: reqwest::Client, token: Arc<dyn TokenProvider>) -> Self {
        Self {
            client,
            token,
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            page_size: 100,
        }
    }

    /// Override the metadata API base, e.g. to point at a mock server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the media upload base.
    pub fn with_upload_base(mut self, base: impl Into<String>) -> Self {
        self.upload_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Entries per listing page. Range: 1–1000. Default: 100.
    pub fn with_page_size(mut self, n: u32) -> Self {
        self.page_size = n.clamp(1, 1000);
        self
    }

    async fn fetch_metadata(&self, id: &str) -> Result<DriveFile, StorageError> {
        let token = self.token.access_token().await?;
        let url = format!("{}/files/{}", self.api_base, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("fields", FILE_FIELDS), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let response = check_status(response, id).await?;
        response
            .json::<DriveFile>()
            .await
            .map_err(|e| StorageError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl Storage for DriveStorage {
    async fn open_folder(&self, folder_id: &str) -> Result<DriveFile, StorageError> {
        let folder = self.fetch_metadata(folder_id).await?;
        if !folder.is_folder() {
            return Err(StorageError::NotAFolder {
                id: folder_id.to_string(),
                mime_type: folder.mime_type,
            });
        }
        debug!("Opened folder '{}' ({})", folder.name, folder.id);
        Ok(folder)
    }

    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilePage, StorageError> {
        let token = self.token.access_token().await?;
        let url = format!("{}/files", self.api_base);
        let q = parents_query(folder_id);
        let page_size = self.page_size.to_string();

        let mut request = self.client.get(&url).bearer_auth(token).query(&[
            ("q", q.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", page_size.as_str()),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        if let Some(t) = page_token {
            request = request.query(&[("pageToken", t)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let response = check_status(response, folder_id).await?;
        response
            .json::<FilePage>()
            .await
            .map_err(|e| StorageError::Malformed(e.to_string()))
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile, StorageError> {
        self.fetch_metadata(file_id).await
    }

    async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> Result<DriveFile, StorageError> {
        let token = self.token.access_token().await?;
        let url = format!("{}/files", self.upload_base);
        let size = content.len();
        let (boundary, body) = multipart_related_body(name, mime_type, content)?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", FILE_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let response = check_status(response, name).await?;
        let created = response
            .json::<DriveFile>()
            .await
            .map_err(|e| StorageError::Malformed(e.to_string()))?;
        info!("Uploaded '{}' ({} bytes) as {}", created.name, size, created.id);
        Ok(created)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Drive search query selecting the folder's non-trashed children.
fn parents_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false")
}

/// Boundary that does not occur in `content`: the fixed prefix, with a
/// numeric suffix appended until it no longer collides.
fn multipart_boundary(content: &[u8]) -> String {
    let occurs = |b: &str| content.windows(b.len()).any(|w| w == b.as_bytes());
    if !occurs(MULTIPART_BOUNDARY) {
        return MULTIPART_BOUNDARY.to_string();
    }
    (1u64..)
        .map(|n| format!("{MULTIPART_BOUNDARY}_{n}"))
        .find(|b| !occurs(b))
        .unwrap_or_else(|| MULTIPART_BOUNDARY.to_string())
}

/// Assemble the two-part upload body: JSON metadata, then raw media.
///
/// Returns the boundary alongside the body; it goes into the
/// `Content-Type` header.
fn multipart_related_body(
    name: &str,
    mime_type: &str,
    content: Vec<u8>,
) -> Result<(String, Vec<u8>), StorageError> {
    let metadata = serde_json::json!({ "name": name, "mimeType": mime_type });
    let metadata =
        serde_json::to_string(&metadata).map_err(|e| StorageError::Malformed(e.to_string()))?;
    let boundary = multipart_boundary(&content);

    let mut body = Vec::with_capacity(content.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok((boundary, body))
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map non-success statuses onto [`StorageError`] variants.
async fn check_status(
    response: reqwest::Response,
    id: &str,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(StorageError::NotFound { id: id.to_string() }),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(StorageError::PermissionDenied { id: id.to_string() })
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            Err(StorageError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
