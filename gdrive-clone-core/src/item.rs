//! Item model: remote drive nodes and their resolved local-relative location.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Mime type the drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Mime type the drive uses for shortcuts (aliases to another item).
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// A single remote node, as returned by a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Remote unique identifier.
    pub id: String,
    pub mime_type: String,
    pub name: String,
}

impl Item {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// The name as a single local path component.
    pub fn local_name(&self) -> String {
        local_component(&self.name)
    }
}

/// Turn a remote name into one path component that stays inside its parent.
///
/// Path separators become `_`, and the empty, `.` and `..` names are replaced
/// the same way.
pub fn local_component(name: &str) -> String {
    let component: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if component.is_empty() {
        return "_".to_string();
    }
    if component == "." || component == ".." {
        return component.replace('.', "_");
    }
    component
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.id, self.mime_type)
    }
}

/// A leaf item annotated with the chain of ancestor folder names leading to it.
///
/// `relative_path` is empty for items directly under the listed root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathedItem {
    pub relative_path: PathBuf,
    pub item: Item,
}

impl PathedItem {
    pub fn new(relative_path: impl Into<PathBuf>, item: Item) -> Self {
        Self {
            relative_path: relative_path.into(),
            item,
        }
    }
}
