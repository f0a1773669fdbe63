/// `load_config` module: optional YAML settings for a clone run, plus environment overrides.
///
/// The CLI itself only takes the destination folder and the access-info folder.
/// Everything tunable lives here:
/// - `root_folder_id`: folder to clone (default `root`)
/// - `listing_errors`: `lenient` | `strict`
/// - `pagination`: `first_page` | `all_pages`
/// - `chunk_size`: bytes per ranged download request
/// - `api_base_url`: Drive v3 endpoint
/// - `export_rules`: extra or replacement export table entries
///
/// # Lookup
/// `$GDRIVE_CLONE_CONFIG` if set, else `<access_info_folder>/gdrive_clone.yaml`
/// if present, else built-in defaults. `GDRIVE_CLONE_LISTING_ERRORS` and
/// `GDRIVE_CLONE_PAGINATION` override the file.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Result};
use gdrive_clone_core::clone::{CloneConfig, ListingErrorPolicy, ROOT_FOLDER_ID};
use gdrive_clone_core::drive::{PaginationMode, DEFAULT_CHUNK_SIZE, DRIVE_API_BASE};
use gdrive_clone_core::export_rules::{ExportRules, ExportTarget};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const CONFIG_ENV: &str = "GDRIVE_CLONE_CONFIG";
pub const CONFIG_FILE: &str = "gdrive_clone.yaml";
pub const LISTING_ERRORS_ENV: &str = "GDRIVE_CLONE_LISTING_ERRORS";
pub const PAGINATION_ENV: &str = "GDRIVE_CLONE_PAGINATION";

fn default_root_folder_id() -> String {
    ROOT_FOLDER_ID.to_string()
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_api_base_url() -> String {
    DRIVE_API_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_root_folder_id")]
    pub root_folder_id: String,
    #[serde(default)]
    pub listing_errors: ListingErrorPolicy,
    #[serde(default)]
    pub pagination: PaginationMode,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub export_rules: HashMap<String, ExportTarget>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_folder_id: default_root_folder_id(),
            listing_errors: ListingErrorPolicy::default(),
            pagination: PaginationMode::default(),
            chunk_size: default_chunk_size(),
            api_base_url: default_api_base_url(),
            export_rules: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn clone_config(&self, export_folder: impl Into<PathBuf>) -> CloneConfig {
        let mut config = CloneConfig::new(export_folder);
        config.root_folder_id = self.root_folder_id.clone();
        config.listing_errors = self.listing_errors;
        config.export_rules = ExportRules::default().merged_with(self.export_rules.clone());
        config
    }

    pub fn trace_loaded(&self) {
        info!(
            root_folder_id = %self.root_folder_id,
            listing_errors = ?self.listing_errors,
            pagination = ?self.pagination,
            chunk_size = self.chunk_size,
            extra_export_rules = self.export_rules.len(),
            "Loaded settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }
}

/// Parse a YAML settings file. An empty file yields the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading settings from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read settings file");
        anyhow!("Failed to read settings file {:?}: {}", path_ref, e)
    })?;

    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse settings YAML");
        anyhow!("Failed to parse settings YAML {:?}: {}", path_ref, e)
    })
}

/// Settings file to use for this run, if any.
pub fn resolve_config_path(access_info_folder: &Path) -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    let candidate = access_info_folder.join(CONFIG_FILE);
    candidate.exists().then_some(candidate)
}

/// Resolve, load and environment-override the settings for a run.
pub fn load_settings(access_info_folder: &Path) -> Result<Settings> {
    let mut settings = match resolve_config_path(access_info_folder) {
        Some(path) => load_config(path)?,
        None => {
            debug!("No settings file found, using defaults");
            Settings::default()
        }
    };
    apply_env_overrides(&mut settings)?;
    settings.trace_loaded();
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    if let Ok(raw) = env::var(LISTING_ERRORS_ENV) {
        settings.listing_errors = raw
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", LISTING_ERRORS_ENV, e))?;
    }
    if let Ok(raw) = env::var(PAGINATION_ENV) {
        settings.pagination = raw
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {}", PAGINATION_ENV, e))?;
    }
    Ok(())
}
