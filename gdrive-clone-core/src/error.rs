//! Error types for listing, downloading and authenticating against the drive.

use std::path::PathBuf;
use thiserror::Error;

use crate::item::Item;

/// Failures talking to the remote drive or its credential store.
///
/// No distinction is drawn between a vanished item, a permission problem or an
/// exhausted quota: they all arrive as [`DriveError::Api`] with the HTTP status.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required file not found: {0}")]
    MissingFile(PathBuf),
}

/// Failures that end a clone run.
#[derive(Error, Debug)]
pub enum CloneError {
    /// Listing failed and the run was configured to treat that as fatal.
    #[error("Failed listing folder {folder_id}: {source}")]
    Listing {
        folder_id: String,
        #[source]
        source: DriveError,
    },

    #[error("Failed downloading item {item}: {source}")]
    Download {
        item: Item,
        #[source]
        source: DriveError,
    },
}

impl CloneError {
    /// The item whose download failed, if this is a per-item failure.
    pub fn item(&self) -> Option<&Item> {
        match self {
            CloneError::Download { item, .. } => Some(item),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn download_error_names_the_item_and_keeps_the_cause() {
        let err = CloneError::Download {
            item: Item::new("id-2", "text/plain", "second.txt"),
            source: DriveError::Api {
                status: 503,
                message: "backend unavailable".into(),
            },
        };

        assert_eq!(
            err.to_string(),
            "Failed downloading item second.txt (id-2, text/plain): \
             Drive API error (status 503): backend unavailable"
        );
        assert_eq!(err.item().map(|i| i.id.as_str()), Some("id-2"));
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<DriveError>()),
            Some(DriveError::Api { status: 503, .. })
        ));
    }

    #[test]
    fn listing_error_has_no_item() {
        let err = CloneError::Listing {
            folder_id: "root".into(),
            source: DriveError::Parse("bad json".into()),
        };
        assert!(err.item().is_none());
        assert_eq!(
            err.to_string(),
            "Failed listing folder root: Failed to parse API response: bad json"
        );
    }
}
