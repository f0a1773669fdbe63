//! Mime-type export table.
//!
//! Vendor-native documents have no stored bytes and must be converted by the
//! drive on download. The table maps a source mime type to the format it is
//! exported as and the extension appended to the local file name. An entry
//! with an empty target mime type marks items that are skipped entirely.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::item::SHORTCUT_MIME_TYPE;

pub const GOOGLE_DOCUMENT: &str = "application/vnd.google-apps.document";
pub const GOOGLE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Where a source mime type is exported to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    /// Target mime type; empty means skip.
    pub mime_type: String,
    /// Appended verbatim to the item name, including the leading dot.
    #[serde(default)]
    pub extension: String,
}

impl ExportTarget {
    pub fn new(mime_type: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            extension: extension.into(),
        }
    }

    pub fn skip() -> Self {
        Self::new("", "")
    }

    pub fn is_skip(&self) -> bool {
        self.mime_type.is_empty()
    }
}

/// What to do with an item of a given mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDecision<'a> {
    Export(&'a ExportTarget),
    Skip,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRules {
    rules: HashMap<String, ExportTarget>,
}

impl ExportRules {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for `source_mime_type`.
    pub fn insert(&mut self, source_mime_type: impl Into<String>, target: ExportTarget) {
        self.rules.insert(source_mime_type.into(), target);
    }

    /// Overlay `overrides` onto this table, replacing rules with the same key.
    pub fn merged_with(mut self, overrides: HashMap<String, ExportTarget>) -> Self {
        self.rules.extend(overrides);
        self
    }

    pub fn get(&self, mime_type: &str) -> Option<&ExportTarget> {
        self.rules.get(mime_type)
    }

    pub fn decide(&self, mime_type: &str) -> ExportDecision<'_> {
        match self.rules.get(mime_type) {
            Some(target) if target.is_skip() => ExportDecision::Skip,
            Some(target) => ExportDecision::Export(target),
            None => ExportDecision::Raw,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ExportRules {
    /// Documents become `.docx`, spreadsheets `.xlsx`, shortcuts are skipped.
    fn default() -> Self {
        let mut rules = Self::empty();
        rules.insert(GOOGLE_DOCUMENT, ExportTarget::new(DOCX, ".docx"));
        rules.insert(GOOGLE_SPREADSHEET, ExportTarget::new(XLSX, ".xlsx"));
        rules.insert(SHORTCUT_MIME_TYPE, ExportTarget::skip());
        rules
    }
}
