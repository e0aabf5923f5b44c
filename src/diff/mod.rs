//! Change detection between two scans.
//!
//! This module provides:
//! - Unified patch generation for text content
//! - The [`DiffEngine`] that turns two [`ScanResult`](crate::scanner::ScanResult)s
//!   into a [`ChangeReport`]
//! - ASCII tree rendering of a scan

/// Scan comparison.
pub mod engine;
/// ASCII tree rendering.
pub mod tree;
/// Unified diff generation for text files
pub mod unified;

pub use engine::DiffEngine;
pub use tree::render_tree;
pub use unified::{UnifiedDiffConfig, generate_unified_diff};

use crate::scanner::FileSystemEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use similar::Algorithm;

/// Convert `DiffAlgorithm` config enum to `similar::Algorithm`
#[must_use]
pub const fn config_to_algorithm(algo: &crate::config::DiffAlgorithm) -> Algorithm {
    match algo {
        crate::config::DiffAlgorithm::Myers => Algorithm::Myers,
        crate::config::DiffAlgorithm::Patience => Algorithm::Patience,
    }
}

/// How a file changed between two scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Present only in the newer scan
    Added,
    /// Present only in the older scan
    Deleted,
    /// Present in both with a different modification time
    Modified,
}

/// The change recorded for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Relative path of the file
    pub path: String,
    /// Kind of change
    #[serde(rename = "type")]
    pub kind: DiffKind,
    /// Captured content in the older scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    /// Captured content in the newer scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    /// Unified patch; unset when either side had no captured content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Everything that changed between two scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    /// When the report was computed
    pub timestamp: DateTime<Utc>,
    /// Files only in the newer scan, sorted by path
    pub added_files: Vec<FileDiff>,
    /// Files only in the older scan, sorted by path
    pub deleted_files: Vec<FileDiff>,
    /// Files whose modification time changed, sorted by path
    pub modified_files: Vec<FileDiff>,
    /// Rendered tree of the newer scan
    pub project_structure: String,
    /// Every file of the newer scan, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_files: Option<Vec<FileSystemEntry>>,
}

impl ChangeReport {
    /// Total number of added, deleted and modified files.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added_files.len() + self.deleted_files.len() + self.modified_files.len()
    }

    /// Returns `true` if no file changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }
}
