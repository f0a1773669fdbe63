//! Exporter/downloader: writes one manifest entry to local disk.
//!
//! The export table decides per item between a server-side export, a raw media
//! download, or skipping it. Content is pulled chunk by chunk into memory and
//! written to the target path in one go, replacing any existing file.
//!
//! Errors are returned bare; the caller attaches the item context.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::contract::{ContentRequest, DirectoryService};
use crate::error::DriveError;
use crate::export_rules::{ExportDecision, ExportRules};
use crate::item::{Item, PathedItem};

/// What happened to a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Converted server-side and written to the contained path.
    Exported(PathBuf),
    /// Raw bytes written to the contained path.
    Downloaded(PathBuf),
    /// Skip-class item; nothing fetched or written.
    Skipped,
}

impl DownloadOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Exported(p) | DownloadOutcome::Downloaded(p) => Some(p),
            DownloadOutcome::Skipped => None,
        }
    }
}

/// Create `root_folder/relative_path` if needed, then download the item into it.
pub async fn export_item<S>(
    service: &S,
    pathed_item: &PathedItem,
    root_folder: &Path,
    rules: &ExportRules,
) -> Result<DownloadOutcome, DriveError>
where
    S: DirectoryService + ?Sized,
{
    let folder_path = root_folder.join(&pathed_item.relative_path);
    fs::create_dir_all(&folder_path).map_err(|source| DriveError::Io {
        path: folder_path.clone(),
        source,
    })?;

    download_file(service, &pathed_item.item, &folder_path, rules).await
}

/// Download `item` into `folder_path`, exporting or skipping as the table dictates.
pub async fn download_file<S>(
    service: &S,
    item: &Item,
    folder_path: &Path,
    rules: &ExportRules,
) -> Result<DownloadOutcome, DriveError>
where
    S: DirectoryService + ?Sized,
{
    let (file_path, request, exported) = match rules.decide(&item.mime_type) {
        ExportDecision::Skip => {
            warn!(item = %item, "Skipping item with no export target");
            println!("SKIPPED {}", folder_path.join(item.local_name()).display());
            return Ok(DownloadOutcome::Skipped);
        }
        ExportDecision::Export(target) => (
            folder_path.join(format!("{}{}", item.local_name(), target.extension)),
            ContentRequest::Export {
                file_id: item.id.clone(),
                mime_type: target.mime_type.clone(),
            },
            true,
        ),
        ExportDecision::Raw => (
            folder_path.join(item.local_name()),
            ContentRequest::Media {
                file_id: item.id.clone(),
            },
            false,
        ),
    };

    println!("download {}", file_path.display());
    let content = fetch_content(service, request).await?;

    fs::write(&file_path, &content).map_err(|source| DriveError::Io {
        path: file_path.clone(),
        source,
    })?;
    info!(
        item_id = %item.id,
        path = %file_path.display(),
        bytes = content.len(),
        exported,
        "File downloaded"
    );
    println!("File downloaded as {}", file_path.display());

    Ok(if exported {
        DownloadOutcome::Exported(file_path)
    } else {
        DownloadOutcome::Downloaded(file_path)
    })
}

/// Pull a download to completion, one chunk at a time.
pub async fn fetch_content<S>(service: &S, request: ContentRequest) -> Result<Vec<u8>, DriveError>
where
    S: DirectoryService + ?Sized,
{
    let file_id = request.file_id().to_owned();
    let mut source = service.open_download(request).await?;
    let mut buffer = Vec::new();

    loop {
        let chunk = source.next_chunk().await?;
        buffer.extend_from_slice(&chunk.bytes);
        let percent = (chunk.progress.clamp(0.0, 1.0) * 100.0) as u32;
        debug!(file_id = %file_id, received = buffer.len(), percent, "Chunk received");
        println!("Download {}%.", percent);
        if chunk.done {
            break;
        }
    }

    Ok(buffer)
}
