//! # contract: capability interfaces the clone pipeline depends on
//!
//! The pipeline never talks to the network directly. It is handed:
//! - a [`DirectoryService`] able to list a folder's children and open a content download,
//! - a [`CredentialProvider`] able to yield a bearer [`Credential`] for building that service.
//!
//! Both are passed explicitly through every call, so tests drive the pipeline with
//! fakes or the generated `mockall` mocks (`MockDirectoryService`, `MockCredentialProvider`).
//!
//! ## Downloads
//! A download is opened per [`ContentRequest`] and then pulled one [`Chunk`] at a time
//! through a [`ChunkSource`] until a chunk reports `done`.

use async_trait::async_trait;
use std::fmt;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::DriveError;
use crate::item::Item;

/// Which flavour of content fetch to issue for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRequest {
    /// Server-side conversion of a vendor-native document to `mime_type`.
    Export { file_id: String, mime_type: String },
    /// Byte-identical download of the stored content.
    Media { file_id: String },
}

impl ContentRequest {
    pub fn file_id(&self) -> &str {
        match self {
            ContentRequest::Export { file_id, .. } | ContentRequest::Media { file_id } => file_id,
        }
    }
}

/// One unit of transferred content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub bytes: Vec<u8>,
    /// Fraction of the whole body received so far, in `0.0..=1.0`.
    pub progress: f32,
    /// Set on the final chunk.
    pub done: bool,
}

/// A resumable, chunk-by-chunk content download.
#[async_trait]
pub trait ChunkSource: Send {
    /// Fetch the next chunk. Must not be called again after a chunk with `done` set.
    async fn next_chunk(&mut self) -> Result<Chunk, DriveError>;
}

/// Remote hierarchical document store.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Direct, non-trashed children of `folder_id`, in the order the service returns them.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<Item>, DriveError>;

    /// Begin a content download.
    async fn open_download(
        &self,
        request: ContentRequest,
    ) -> Result<Box<dyn ChunkSource>, DriveError>;
}

/// Bearer credential scoped to read-only drive access.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Source of a valid (possibly freshly refreshed) credential.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<Credential, DriveError>;
}
