///
/// This module implements the CLI interface for gdrive-clone: argument parsing
/// and the async entrypoint that wires credentials, the Drive client and the
/// clone pipeline together.
///
/// All core business logic lives in the [`gdrive-clone-core`] crate.
///
/// ## How To Use
/// - For command-line users: `gdrive-clone <export_folder_path> [-user_access_info_folder_path <dir>]`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`gdrive-clone-core`]: ../../gdrive-clone-core/
use crate::load_config::load_settings;
use anyhow::{Context, Result};
use clap::Parser;
use gdrive_clone_core::clone::{clone_drive, CloneReport};
use gdrive_clone_core::contract::CredentialProvider;
use gdrive_clone_core::credentials::TokenFileCredentials;
use gdrive_clone_core::drive::GoogleDriveClient;
use std::ffi::OsString;
use std::path::PathBuf;

const ACCESS_INFO_FLAG: &str = "user_access_info_folder_path";

/// Clone a google drive locally.
#[derive(Parser, Debug)]
#[clap(name = "gdrive-clone", version, about = "Clone a google drive locally.")]
pub struct Cli {
    /// Path of the local folder the google drive will be cloned into
    pub export_folder_path: PathBuf,

    /// Path of the local folder containing user authentication info
    /// (token.json, client_secrets.json)
    #[clap(long = "user_access_info_folder_path")]
    pub user_access_info_folder_path: Option<PathBuf>,
}

/// Rewrite the single-dash `-user_access_info_folder_path` spelling to the
/// double-dash form clap understands.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let single = format!("-{}", ACCESS_INFO_FLAG);
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if s == single || s.starts_with(&format!("{}=", single)) => {
                OsString::from(format!("-{}", s))
            }
            _ => arg,
        })
        .collect()
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<CloneReport> {
    tracing::info!("trace_initialised");

    let access_info = cli
        .user_access_info_folder_path
        .unwrap_or_else(|| PathBuf::from("."));
    let settings = load_settings(&access_info)?;

    let provider = TokenFileCredentials::new(&access_info);
    let credential = provider
        .credential()
        .await
        .with_context(|| format!("Failed to obtain drive credentials from {}", access_info.display()))?;

    let service = GoogleDriveClient::new(credential)
        .with_base_url(settings.api_base_url.clone())
        .with_chunk_size(settings.chunk_size)
        .with_pagination(settings.pagination);
    let config = settings.clone_config(cli.export_folder_path);

    tracing::info!(export_folder = %config.export_folder.display(), "Starting clone");
    let report = clone_drive(&service, &config).await?;

    println!(
        "Clone complete: {} downloaded, {} exported, {} skipped.",
        report.downloaded, report.exported, report.skipped
    );
    Ok(report)
}
