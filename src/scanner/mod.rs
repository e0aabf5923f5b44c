//! Directory scanning.
//!
//! The [`DirectoryScanner`] walks a [`FileSystem`] capability depth-first and
//! produces a flat [`ScanResult`]. Paths rejected by the [`IgnoreFilter`] are
//! never recorded, and excluded directories are never entered. Failures below
//! the root only cost the entries of the affected subtree.

/// Content capture policy (size cap, text allow-list, decoding).
pub mod content;
/// Gitignore-dialect inclusion predicate.
pub mod ignore;

pub use content::ContentPolicy;
pub use ignore::IgnoreFilter;

use crate::METADATA_DIR;
use crate::config::ScanConfig;
use crate::fs::{self, EntryKind, FileSystem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info, span, warn};

/// One file or directory found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEntry {
    /// File name (last path component)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Relative, "/"-joined path; unique within a scan
    pub path: String,
    /// Modification time in milliseconds since the Unix epoch (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    /// Size in bytes (files only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Text content, captured only for small files on the text allow-list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileSystemEntry {
    /// Returns `true` for files.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// A complete inventory of the tree taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// All included entries, in traversal order
    pub entries: Vec<FileSystemEntry>,
    /// When the scan started
    pub timestamp: DateTime<Utc>,
}

impl ScanResult {
    /// Looks up an entry by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileSystemEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Iterates over file entries.
    pub fn files(&self) -> impl Iterator<Item = &FileSystemEntry> {
        self.entries.iter().filter(|entry| entry.is_file())
    }

    /// Iterates over directory entries.
    pub fn directories(&self) -> impl Iterator<Item = &FileSystemEntry> {
        self.entries.iter().filter(|entry| !entry.is_file())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scanner options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Content capture cap in bytes
    pub max_content_size: u64,
    /// Extensions or file names whose content is captured
    pub text_extensions: Vec<String>,
    /// Patterns applied in addition to the project's ignore file
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for ScanOptions {
    fn from(config: &ScanConfig) -> Self {
        Self {
            max_content_size: config.max_content_size,
            text_extensions: config.text_extensions.clone(),
            ignore_patterns: config.ignore_patterns.clone(),
        }
    }
}

/// Recursive project-tree scanner.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    /// Patterns added to every ignore filter this scanner builds
    ignore_patterns: Vec<String>,
    /// Which files get their content captured
    content: ContentPolicy,
}

impl Default for DirectoryScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl DirectoryScanner {
    /// Creates a scanner.
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            content: ContentPolicy::new(options.max_content_size, &options.text_extensions),
            ignore_patterns: options.ignore_patterns,
        }
    }

    /// Builds the inclusion filter for a tree.
    #[must_use]
    pub fn ignore_filter(&self, fs: &dyn FileSystem) -> IgnoreFilter {
        IgnoreFilter::load(fs, &self.ignore_patterns)
    }

    /// Patterns added on top of the project's ignore file.
    #[must_use]
    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore_patterns
    }

    /// Scans the whole tree.
    ///
    /// Never fails: an unreadable root yields an empty result and unreadable
    /// subtrees or files are logged and left out.
    #[must_use]
    pub fn scan(&self, fs: &dyn FileSystem) -> ScanResult {
        let span = span!(Level::DEBUG, "scan");
        let _guard = span.enter();

        let timestamp = Utc::now();
        let filter = self.ignore_filter(fs);
        let mut entries = Vec::new();

        self.scan_dir(fs, &filter, "", &mut entries);

        info!(
            entries = entries.len(),
            files = entries.iter().filter(|e| e.is_file()).count(),
            "Scan complete"
        );

        ScanResult { entries, timestamp }
    }

    fn scan_dir(
        &self,
        fs: &dyn FileSystem,
        filter: &IgnoreFilter,
        dir: &str,
        entries: &mut Vec<FileSystemEntry>,
    ) {
        let children = match fs.read_dir(dir) {
            Ok(children) => children,
            Err(e) => {
                warn!(dir, error = %e, "Failed to read directory, skipping subtree");
                return;
            }
        };

        for child in children {
            let path = fs::join(dir, &child.name);

            if child.name == METADATA_DIR {
                continue;
            }
            if !filter.should_include(&path, child.kind.is_dir()) {
                debug!(path = %path, "Excluded by ignore rules");
                continue;
            }

            match child.kind {
                EntryKind::Directory => {
                    entries.push(FileSystemEntry {
                        name: child.name,
                        kind: EntryKind::Directory,
                        path: path.clone(),
                        last_modified: None,
                        size: None,
                        content: None,
                    });
                    self.scan_dir(fs, filter, &path, entries);
                }
                EntryKind::File => {
                    if let Some(entry) = self.scan_file(fs, child.name, path) {
                        entries.push(entry);
                    }
                }
            }
        }
    }

    fn scan_file(&self, fs: &dyn FileSystem, name: String, path: String) -> Option<FileSystemEntry> {
        let meta = match fs.metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read file metadata, skipping");
                return None;
            }
        };

        let content = if self.content.wants(&path, meta.size) {
            match fs.read(&path) {
                Ok(bytes) => content::decode_text(&bytes),
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to read file content");
                    None
                }
            }
        } else {
            None
        };

        Some(FileSystemEntry {
            name,
            kind: EntryKind::File,
            path,
            last_modified: meta.modified,
            size: Some(meta.size),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IGNORE_FILE;
    use crate::fs::MemoryFs;
    use anyhow::Result;

    fn paths(scan: &ScanResult) -> Vec<&str> {
        let mut paths: Vec<_> = scan.entries.iter().map(|e| e.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    #[test]
    fn test_ignored_file_is_absent() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("a.txt", "hello")?;
        mem.insert_file("b.txt", "secret")?;
        mem.insert_file(IGNORE_FILE, "b.txt\n.gitignore\n")?;

        let scan = DirectoryScanner::default().scan(&mem);

        assert_eq!(paths(&scan), vec!["a.txt"]);
        assert_eq!(scan.entries[0].content.as_deref(), Some("hello"));

        Ok(())
    }

    #[test]
    fn test_excluded_directory_is_pruned() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("src/main.rs", "fn main() {}")?;
        mem.insert_file("target/debug/app", "bin")?;
        mem.insert_file(IGNORE_FILE, "target/")?;
        // Reading the pruned subtree would fail; it must never be entered.
        mem.deny("target/debug");

        let scan = DirectoryScanner::default().scan(&mem);

        assert!(scan.get("target").is_none());
        assert!(scan.entries.iter().all(|e| !e.path.starts_with("target")));
        assert!(scan.get("src/main.rs").is_some());

        Ok(())
    }

    #[test]
    fn test_metadata_directory_is_always_skipped() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file(&format!("{METADATA_DIR}/v1/a.txt"), "x")?;
        mem.insert_file(IGNORE_FILE, format!("!{METADATA_DIR}/"))?;
        mem.insert_file("a.txt", "x")?;

        let scan = DirectoryScanner::default().scan(&mem);

        assert!(scan.entries.iter().all(|e| !e.path.starts_with(METADATA_DIR)));

        Ok(())
    }

    #[test]
    fn test_content_capture_rules() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("notes.md", "# notes")?;
        mem.insert_file("logo.png", [0x89, b'P', b'N', b'G'])?;
        mem.insert_file("big.txt", vec![b'a'; 2 * 1024 * 1024])?;

        let scan = DirectoryScanner::default().scan(&mem);

        let notes = scan.get("notes.md").unwrap();
        assert_eq!(notes.content.as_deref(), Some("# notes"));

        let logo = scan.get("logo.png").unwrap();
        assert_eq!(logo.size, Some(4));
        assert!(logo.content.is_none());

        let big = scan.get("big.txt").unwrap();
        assert_eq!(big.size, Some(2 * 1024 * 1024));
        assert!(big.content.is_none());

        Ok(())
    }

    #[test]
    fn test_unreadable_subtree_is_isolated() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("ok/a.txt", "a")?;
        mem.insert_file("locked/b.txt", "b")?;
        mem.deny("locked");

        let scan = DirectoryScanner::default().scan(&mem);

        assert!(scan.get("ok/a.txt").is_some());
        assert!(scan.get("locked/b.txt").is_none());

        Ok(())
    }

    #[test]
    fn test_directories_have_no_metadata() -> Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("src/lib.rs", "")?;

        let scan = DirectoryScanner::default().scan(&mem);
        let dir = scan.get("src").unwrap();

        assert_eq!(dir.kind, EntryKind::Directory);
        assert_eq!(dir.name, "src");
        assert!(dir.size.is_none() && dir.last_modified.is_none() && dir.content.is_none());
        assert_eq!(scan.files().count(), 1);
        assert_eq!(scan.directories().count(), 1);

        Ok(())
    }

    #[test]
    fn test_entry_serializes_camel_case() -> Result<()> {
        let entry = FileSystemEntry {
            name: "a.txt".to_string(),
            kind: EntryKind::File,
            path: "a.txt".to_string(),
            last_modified: Some(42),
            size: Some(5),
            content: None,
        };

        let json = serde_json::to_string(&entry)?;
        assert!(json.contains("\"lastModified\":42"));
        assert!(json.contains("\"kind\":\"file\""));
        assert!(!json.contains("content"));

        Ok(())
    }
}
