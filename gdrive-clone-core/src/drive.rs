//! Google Drive v3 REST implementation of [`DirectoryService`].
//!
//! Listing asks only for `id`, `mimeType` and `name` of non-trashed children.
//! Content is fetched with ranged GET requests, `chunk_size` bytes at a time.
//! The export endpoint ignores `Range` and answers `200` with the whole body,
//! which ends the download after one chunk.

use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::contract::{Chunk, ChunkSource, ContentRequest, Credential, DirectoryService};
use crate::error::DriveError;
use crate::item::Item;

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Bytes requested per ranged download request.
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

const LIST_FIELDS: &str = "nextPageToken, files(id, mimeType, name)";

/// How many listing pages are fetched per folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Only the first page; entries beyond it are not listed.
    #[default]
    FirstPage,
    /// Follow `nextPageToken` until the folder is exhausted.
    AllPages,
}

impl std::str::FromStr for PaginationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_page" => Ok(PaginationMode::FirstPage),
            "all_pages" => Ok(PaginationMode::AllPages),
            other => Err(format!("unknown pagination mode '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilesListResponse {
    #[serde(default)]
    files: Vec<Item>,
    next_page_token: Option<String>,
}

pub struct GoogleDriveClient {
    http: reqwest::Client,
    base_url: String,
    credential: Credential,
    chunk_size: u64,
    pagination: PaginationMode,
}

impl GoogleDriveClient {
    pub fn new(credential: Credential) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DRIVE_API_BASE.to_string(),
            credential,
            chunk_size: DEFAULT_CHUNK_SIZE,
            pagination: PaginationMode::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationMode) -> Self {
        self.pagination = pagination;
        self
    }

    #[instrument(skip(self, page_token))]
    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FilesListResponse, DriveError> {
        let url = format!("{}/files", self.base_url);
        let mut query = vec![
            ("q", parents_query(folder_id)),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        debug!(url = %url, "Listing folder children");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .bearer_auth(self.credential.access_token())
            .send()
            .await?;
        let response = error_for_status(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body)
            .map_err(|e| DriveError::Parse(format!("Failed to parse files list response: {}", e)))
    }
}

/// Drive search query selecting the non-trashed children of `folder_id`.
pub fn parents_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed=false", escaped)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
    Err(DriveError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DirectoryService for GoogleDriveClient {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<Item>, DriveError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(folder_id, page_token.as_deref()).await?;
            items.extend(page.files);

            match (page.next_page_token, self.pagination) {
                (Some(token), PaginationMode::AllPages) => page_token = Some(token),
                (Some(_), PaginationMode::FirstPage) => {
                    warn!(
                        folder_id,
                        listed = items.len(),
                        "Folder has more entries than one page; the rest are not listed"
                    );
                    break;
                }
                (None, _) => break,
            }
        }

        Ok(items)
    }

    async fn open_download(
        &self,
        request: ContentRequest,
    ) -> Result<Box<dyn ChunkSource>, DriveError> {
        let (url, query) = match &request {
            ContentRequest::Export { file_id, mime_type } => (
                format!("{}/files/{}/export", self.base_url, file_id),
                vec![("mimeType".to_string(), mime_type.clone())],
            ),
            ContentRequest::Media { file_id } => (
                format!("{}/files/{}", self.base_url, file_id),
                vec![("alt".to_string(), "media".to_string())],
            ),
        };
        debug!(url = %url, "Opening download");

        Ok(Box::new(RangedDownload {
            http: self.http.clone(),
            url,
            query,
            access_token: self.credential.access_token().to_string(),
            chunk_size: self.chunk_size,
            received: 0,
            total: None,
        }))
    }
}

/// Download driven by successive `Range` requests.
pub struct RangedDownload {
    http: reqwest::Client,
    url: String,
    query: Vec<(String, String)>,
    access_token: String,
    chunk_size: u64,
    received: u64,
    total: Option<u64>,
}

impl RangedDownload {
    fn progress(&self) -> f32 {
        match self.total {
            Some(0) => 1.0,
            None => 0.0,
            Some(total) => (self.received as f64 / total as f64).min(1.0) as f32,
        }
    }
}

#[async_trait]
impl ChunkSource for RangedDownload {
    async fn next_chunk(&mut self) -> Result<Chunk, DriveError> {
        let end = self.received + self.chunk_size - 1;
        let response = self
            .http
            .get(&self.url)
            .query(&self.query)
            .bearer_auth(&self.access_token)
            .header(RANGE, format!("bytes={}-{}", self.received, end))
            .send()
            .await?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {
                let total = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range_total);
                if total.is_some() {
                    self.total = total;
                }
                let bytes = response.bytes().await?.to_vec();
                if bytes.is_empty() {
                    if let Some(total) = self.total.filter(|total| self.received < *total) {
                        return Err(DriveError::Parse(format!(
                            "empty partial response at byte {} of {}",
                            self.received, total
                        )));
                    }
                }
                self.received += bytes.len() as u64;

                let done = match self.total {
                    Some(total) => self.received >= total,
                    None => (bytes.len() as u64) < self.chunk_size,
                };
                let progress = if done { 1.0 } else { self.progress() };
                Ok(Chunk {
                    bytes,
                    progress,
                    done,
                })
            }
            StatusCode::OK => {
                let bytes = response.bytes().await?.to_vec();
                self.received = bytes.len() as u64;
                self.total = Some(self.received);
                Ok(Chunk {
                    bytes,
                    progress: 1.0,
                    done: true,
                })
            }
            StatusCode::RANGE_NOT_SATISFIABLE if self.received == 0 => {
                self.total = Some(0);
                Ok(Chunk {
                    bytes: Vec::new(),
                    progress: 1.0,
                    done: true,
                })
            }
            status => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
                Err(DriveError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/// Total length from a `Content-Range` value such as `bytes 0-99/1234`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}
