use super::tree::render_tree;
use super::unified::{NULL_PATH, UnifiedDiffConfig, generate_unified_diff};
use super::{ChangeReport, DiffKind, FileDiff, config_to_algorithm};
use crate::config::ReportConfig;
use crate::scanner::{FileSystemEntry, ScanResult};
use chrono::Utc;
use std::collections::HashMap;
use tracing::{Level, info, span};

/// Compares two scans.
///
/// Only files produce [`FileDiff`]s; directory changes show up through the
/// files they contain and through the rendered tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine {
    config: UnifiedDiffConfig,
}

impl From<&ReportConfig> for DiffEngine {
    fn from(config: &ReportConfig) -> Self {
        Self::new(UnifiedDiffConfig {
            context_lines: config.context_lines,
            algorithm: config_to_algorithm(&config.algorithm),
        })
    }
}

impl DiffEngine {
    /// Creates an engine with the given patch settings.
    #[must_use]
    pub const fn new(config: UnifiedDiffConfig) -> Self {
        Self { config }
    }

    /// Compares `previous` against `current`.
    #[must_use]
    pub fn compare(&self, previous: &ScanResult, current: &ScanResult) -> ChangeReport {
        self.build_report(previous, current, false)
    }

    /// Compares two scans and also lists every file of `current`.
    #[must_use]
    pub fn compare_with_all_files(
        &self,
        previous: &ScanResult,
        current: &ScanResult,
    ) -> ChangeReport {
        self.build_report(previous, current, true)
    }

    /// Full inventory of a single scan: the scan compared with itself.
    ///
    /// The result lists every file and reports no changes.
    #[must_use]
    pub fn baseline(&self, scan: &ScanResult) -> ChangeReport {
        self.build_report(scan, scan, true)
    }

    fn build_report(
        &self,
        previous: &ScanResult,
        current: &ScanResult,
        include_all: bool,
    ) -> ChangeReport {
        let span = span!(Level::DEBUG, "compare_scans");
        let _guard = span.enter();

        let old_files = file_map(previous);
        let new_files = file_map(current);

        let mut added_files = Vec::new();
        let mut modified_files = Vec::new();
        let mut deleted_files = Vec::new();

        for (path, new) in &new_files {
            match old_files.get(path) {
                None => added_files.push(self.added(new)),
                Some(old) => {
                    if is_modified(old, new) {
                        modified_files.push(self.modified(old, new));
                    }
                }
            }
        }

        for (path, old) in &old_files {
            if !new_files.contains_key(path) {
                deleted_files.push(FileDiff {
                    path: old.path.clone(),
                    kind: DiffKind::Deleted,
                    old_content: old.content.clone(),
                    new_content: None,
                    diff: None,
                });
            }
        }

        for list in [&mut added_files, &mut deleted_files, &mut modified_files] {
            list.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let all_files = include_all.then(|| {
            let mut files: Vec<FileSystemEntry> = current.files().cloned().collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            files
        });

        info!(
            added = added_files.len(),
            deleted = deleted_files.len(),
            modified = modified_files.len(),
            "Scan comparison complete"
        );

        ChangeReport {
            timestamp: Utc::now(),
            added_files,
            deleted_files,
            modified_files,
            project_structure: render_tree(&current.entries),
            all_files,
        }
    }

    fn added(&self, new: &FileSystemEntry) -> FileDiff {
        let diff = new
            .content
            .as_deref()
            .map(|content| generate_unified_diff("", content, NULL_PATH, &new.path, &self.config));

        FileDiff {
            path: new.path.clone(),
            kind: DiffKind::Added,
            old_content: None,
            new_content: new.content.clone(),
            diff,
        }
    }

    fn modified(&self, old: &FileSystemEntry, new: &FileSystemEntry) -> FileDiff {
        let diff = match (&old.content, &new.content) {
            (Some(before), Some(after)) => Some(generate_unified_diff(
                before,
                after,
                &old.path,
                &new.path,
                &self.config,
            )),
            _ => None,
        };

        FileDiff {
            path: new.path.clone(),
            kind: DiffKind::Modified,
            old_content: old.content.clone(),
            new_content: new.content.clone(),
            diff,
        }
    }
}

/// Files of a scan keyed by path. A path that became a directory is absent,
/// so the old file reads as deleted and the new file as added.
fn file_map(scan: &ScanResult) -> HashMap<&str, &FileSystemEntry> {
    scan.files().map(|entry| (entry.path.as_str(), entry)).collect()
}

fn is_modified(old: &FileSystemEntry, new: &FileSystemEntry) -> bool {
    match (old.last_modified, new.last_modified) {
        (Some(before), Some(after)) => before != after,
        // Without timestamps fall back to what was observed
        _ => old.size != new.size || old.content != new.content,
    }
}
