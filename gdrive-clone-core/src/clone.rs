//! Top-level pipeline: list the whole drive, then download the manifest.
//!
//! Listing completes before the first download starts. Downloads run strictly
//! one after another; the first failing item aborts the run with
//! [`CloneError::Download`], leaving files written so far on disk.
//!
//! A listing failure is either reported and treated as an empty drive
//! ([`ListingErrorPolicy::Lenient`]) or returned as [`CloneError::Listing`]
//! ([`ListingErrorPolicy::Strict`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

use crate::contract::DirectoryService;
use crate::error::CloneError;
use crate::export_rules::ExportRules;
use crate::exporter::{export_item, DownloadOutcome};
use crate::lister::build_manifest;

/// Id the drive accepts as an alias for the user's root folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// How a failed listing phase is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingErrorPolicy {
    /// Log the failure and carry on as if the drive were empty.
    #[default]
    Lenient,
    /// Abort the run with the listing error.
    Strict,
}

impl std::str::FromStr for ListingErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ListingErrorPolicy::Lenient),
            "strict" => Ok(ListingErrorPolicy::Strict),
            other => Err(format!("unknown listing error policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CloneConfig {
    pub export_folder: PathBuf,
    pub root_folder_id: String,
    pub listing_errors: ListingErrorPolicy,
    pub export_rules: ExportRules,
}

impl CloneConfig {
    pub fn new(export_folder: impl Into<PathBuf>) -> Self {
        Self {
            export_folder: export_folder.into(),
            root_folder_id: ROOT_FOLDER_ID.to_string(),
            listing_errors: ListingErrorPolicy::default(),
            export_rules: ExportRules::default(),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloneReport {
    /// Leaf items found by the listing phase.
    pub listed: usize,
    pub downloaded: usize,
    pub exported: usize,
    pub skipped: usize,
    /// Every file written, in download order.
    pub files: Vec<PathBuf>,
}

pub async fn clone_drive<S>(service: &S, config: &CloneConfig) -> Result<CloneReport, CloneError>
where
    S: DirectoryService + ?Sized,
{
    info!(
        root_folder_id = %config.root_folder_id,
        export_folder = %config.export_folder.display(),
        "Starting drive clone"
    );

    let manifest = match build_manifest(service, &config.root_folder_id).await {
        Ok(manifest) => manifest,
        Err(e) => match config.listing_errors {
            ListingErrorPolicy::Lenient => {
                error!(error = %e, "Listing failed, continuing with an empty manifest");
                println!("An error occurred: {}", e);
                Vec::new()
            }
            ListingErrorPolicy::Strict => {
                error!(error = %e, "Listing failed");
                return Err(CloneError::Listing {
                    folder_id: config.root_folder_id.clone(),
                    source: e,
                });
            }
        },
    };

    let mut report = CloneReport {
        listed: manifest.len(),
        ..CloneReport::default()
    };

    if manifest.is_empty() {
        println!("No files found.");
        return Ok(report);
    }

    for pathed_item in &manifest {
        let outcome = export_item(
            service,
            pathed_item,
            &config.export_folder,
            &config.export_rules,
        )
        .await
        .map_err(|source| {
            error!(item = %pathed_item.item, error = %source, "Download failed, aborting clone");
            CloneError::Download {
                item: pathed_item.item.clone(),
                source,
            }
        })?;

        match outcome {
            DownloadOutcome::Exported(path) => {
                report.exported += 1;
                report.files.push(path);
            }
            DownloadOutcome::Downloaded(path) => {
                report.downloaded += 1;
                report.files.push(path);
            }
            DownloadOutcome::Skipped => report.skipped += 1,
        }
    }

    info!(
        listed = report.listed,
        downloaded = report.downloaded,
        exported = report.exported,
        skipped = report.skipped,
        "Drive clone complete"
    );
    Ok(report)
}
