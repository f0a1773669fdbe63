//! In-memory drive used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gdrive_clone_core::contract::{Chunk, ChunkSource, ContentRequest, DirectoryService};
use gdrive_clone_core::error::DriveError;
use gdrive_clone_core::item::{Item, FOLDER_MIME_TYPE};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Serves a fixed folder tree and file contents, recording every call.
#[derive(Default)]
pub struct FakeDrive {
    children: HashMap<String, Vec<Item>>,
    contents: HashMap<String, Vec<u8>>,
    failing_downloads: HashSet<String>,
    failing_listings: HashSet<String>,
    chunk_size: usize,
    pub listed: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<ContentRequest>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self {
            chunk_size: 4,
            ..Default::default()
        }
    }

    pub fn folder(mut self, parent: &str, id: &str, name: &str) -> Self {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(Item::new(id, FOLDER_MIME_TYPE, name));
        self.children.entry(id.to_string()).or_default();
        self
    }

    pub fn file(mut self, parent: &str, id: &str, mime: &str, name: &str, content: &[u8]) -> Self {
        self.children
            .entry(parent.to_string())
            .or_default()
            .push(Item::new(id, mime, name));
        self.contents.insert(id.to_string(), content.to_vec());
        self
    }

    pub fn failing_download(mut self, id: &str) -> Self {
        self.failing_downloads.insert(id.to_string());
        self
    }

    pub fn failing_listing(mut self, folder_id: &str) -> Self {
        self.failing_listings.insert(folder_id.to_string());
        self
    }

    pub fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryService for FakeDrive {
    async fn list_children(&self, folder_id: &str) -> Result<Vec<Item>, DriveError> {
        self.listed.lock().unwrap().push(folder_id.to_string());
        if self.failing_listings.contains(folder_id) {
            return Err(DriveError::Api {
                status: 500,
                message: format!("listing {} failed", folder_id),
            });
        }
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn open_download(
        &self,
        request: ContentRequest,
    ) -> Result<Box<dyn ChunkSource>, DriveError> {
        self.requests.lock().unwrap().push(request.clone());
        let file_id = request.file_id().to_string();
        if self.failing_downloads.contains(&file_id) {
            return Err(DriveError::Api {
                status: 503,
                message: format!("download of {} failed", file_id),
            });
        }
        let mut content = self.contents.get(&file_id).cloned().unwrap_or_default();
        if let ContentRequest::Export { mime_type, .. } = &request {
            content = format!("exported as {}: ", mime_type)
                .into_bytes()
                .into_iter()
                .chain(content)
                .collect();
        }
        Ok(Box::new(MemoryChunks::new(content, self.chunk_size)))
    }
}

/// Hands out a byte buffer `chunk_size` bytes at a time.
pub struct MemoryChunks {
    content: Vec<u8>,
    chunk_size: usize,
    offset: usize,
}

impl MemoryChunks {
    pub fn new(content: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            content,
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }
}

#[async_trait]
impl ChunkSource for MemoryChunks {
    async fn next_chunk(&mut self) -> Result<Chunk, DriveError> {
        let end = (self.offset + self.chunk_size).min(self.content.len());
        let bytes = self.content[self.offset..end].to_vec();
        self.offset = end;
        let done = self.offset >= self.content.len();
        let progress = if self.content.is_empty() {
            1.0
        } else {
            self.offset as f32 / self.content.len() as f32
        };
        Ok(Chunk {
            bytes,
            progress,
            done,
        })
    }
}
