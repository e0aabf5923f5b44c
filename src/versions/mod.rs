//! Manual point-in-time snapshots of the project tree.
//!
//! Each version is a folder under the metadata directory named after its UTC
//! creation time. It holds a JSON descriptor and a byte-for-byte mirror of
//! every included path. Restoring reconciles the live tree against that
//! mirror: live paths missing from the snapshot are deleted and every
//! snapshot path is written back.
//!
//! None of these operations pause an observer. Callers that use
//! [`VersionManager`] directly must suppress change notifications for the
//! duration; [`Workspace`](crate::workspace::Workspace) does so itself.

/// Progress reporting helpers.
mod progress;

use crate::fs::{self, EntryKind, FileSystem};
use crate::scanner::ignore::IgnoreFilter;
use crate::{METADATA_DIR, VERSION_DESCRIPTOR};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use progress::PercentProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use tracing::{Level, debug, info, span, warn};

/// Version-control directories never copied into a snapshot.
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Folder name format; lexicographic order equals chronological order.
const FOLDER_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Highest `_NNN` suffix tried for backups created within the same second.
const MAX_COLLISIONS: u32 = 999;

/// Progress callback receiving a percentage in `0..=100`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u8);

/// The descriptor stored at the top of every version folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// When the backup was taken
    pub backup_time: DateTime<Utc>,
    /// User-supplied title
    pub version_title: String,
}

/// One entry of [`VersionManager::list_versions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistoryItem {
    /// User-supplied title
    pub version_title: String,
    /// When the backup was taken
    pub backup_time: DateTime<Utc>,
    /// Folder name under the metadata directory; the version id
    pub folder_name: String,
}

/// Outcome of a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Live paths removed because the snapshot does not have them
    pub deleted: usize,
    /// Files written from the snapshot
    pub restored: usize,
    /// Paths that could not be removed or written
    pub failed: usize,
}

/// Creates, lists, restores and deletes versions.
#[derive(Debug, Clone, Default)]
pub struct VersionManager {
    ignore_patterns: Vec<String>,
}

impl VersionManager {
    /// Creates a manager that applies `ignore_patterns` on top of the
    /// root's ignore file, matching the scanner's filter.
    #[must_use]
    pub const fn new(ignore_patterns: Vec<String>) -> Self {
        Self { ignore_patterns }
    }

    /// Copies every included path into a new version folder.
    ///
    /// The descriptor is written before any file. A file that cannot be
    /// copied is logged and left out of the snapshot. Returns the version id.
    ///
    /// # Errors
    /// Returns an error if the version folder or its descriptor cannot be
    /// created, or the root cannot be enumerated.
    pub fn create_backup(
        &self,
        fs: &dyn FileSystem,
        title: &str,
        progress: ProgressFn<'_>,
    ) -> Result<String> {
        let span = span!(Level::INFO, "create_backup", title = title);
        let _guard = span.enter();

        let filter = IgnoreFilter::load(fs, &self.ignore_patterns);
        let live = collect(fs, "", &|path, kind| is_backed_up(&filter, path, kind))
            .context("Failed to enumerate project tree")?;
        let files: Vec<&String> = live
            .iter()
            .filter(|(_, kind)| !kind.is_dir())
            .map(|(path, _)| path)
            .collect();

        let mut progress = PercentProgress::new(progress, files.len());
        progress.start();

        fs.create_dir_all(METADATA_DIR)
            .context("Failed to create metadata directory")?;

        let backup_time = Utc::now();
        let folder_name = allocate_folder(fs, backup_time)?;
        let version_dir = fs::join(METADATA_DIR, &folder_name);
        fs.create_dir_all(&version_dir)
            .with_context(|| format!("Failed to create version folder: {folder_name}"))?;

        let info = VersionInfo {
            backup_time,
            version_title: title.to_string(),
        };
        let descriptor =
            serde_json::to_vec_pretty(&info).context("Failed to encode version descriptor")?;
        fs.write(&fs::join(&version_dir, VERSION_DESCRIPTOR), &descriptor)
            .context("Failed to write version descriptor")?;

        for (path, _) in live.iter().filter(|(_, kind)| kind.is_dir()) {
            if let Err(e) = fs.create_dir_all(&fs::join(&version_dir, path)) {
                warn!(path = %path, error = %e, "Failed to mirror directory");
            }
        }

        let mut copied = 0usize;
        for path in files {
            match copy_file(fs, path, &fs::join(&version_dir, path)) {
                Ok(()) => copied += 1,
                Err(e) => warn!(path = %path, error = %e, "Failed to back up file"),
            }
            progress.advance();
        }
        progress.finish();

        info!(version = %folder_name, files = copied, "Backup created");
        Ok(folder_name)
    }

    /// Lists every readable version, newest first.
    ///
    /// Folders with a missing or corrupt descriptor are skipped.
    ///
    /// # Errors
    /// Returns an error if the metadata directory exists but cannot be read.
    pub fn list_versions(&self, fs: &dyn FileSystem) -> Result<Vec<VersionHistoryItem>> {
        let children = match fs.read_dir(METADATA_DIR) {
            Ok(children) => children,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read metadata directory"),
        };

        let mut versions: Vec<VersionHistoryItem> = children
            .into_iter()
            .filter(|child| child.kind.is_dir())
            .filter_map(|child| match read_descriptor(fs, &child.name) {
                Ok(info) => Some(VersionHistoryItem {
                    version_title: info.version_title,
                    backup_time: info.backup_time,
                    folder_name: child.name,
                }),
                Err(e) => {
                    warn!(version = %child.name, error = %e, "Skipping unreadable version");
                    None
                }
            })
            .collect();

        versions.sort_by(|a, b| {
            b.backup_time
                .cmp(&a.backup_time)
                .then_with(|| b.folder_name.cmp(&a.folder_name))
        });

        Ok(versions)
    }

    /// Makes the live tree match a version for every included path.
    ///
    /// Live paths absent from the snapshot, or of a different kind, are
    /// removed deepest first; then every snapshot path is written back with
    /// its recorded permissions. Paths excluded by the ignore rules are left
    /// untouched, and a stale directory that still holds such paths is kept.
    /// Progress covers removals and copies together.
    ///
    /// # Errors
    /// Returns an error if the version does not exist or either tree cannot
    /// be enumerated. Individual removals and copies are logged and counted
    /// in [`RestoreSummary::failed`].
    pub fn restore(
        &self,
        fs: &dyn FileSystem,
        version_id: &str,
        progress: ProgressFn<'_>,
    ) -> Result<RestoreSummary> {
        validate_version_id(version_id)?;

        let span = span!(Level::INFO, "restore", version = version_id);
        let _guard = span.enter();

        let version_dir = fs::join(METADATA_DIR, version_id);
        let is_version = fs
            .metadata(&version_dir)
            .map(|meta| meta.kind.is_dir())
            .unwrap_or(false);
        if !is_version {
            anyhow::bail!("Version not found: {version_id}");
        }

        let snapshot = collect(fs, &version_dir, &|path, _| path != VERSION_DESCRIPTOR)
            .with_context(|| format!("Failed to read version: {version_id}"))?;

        let filter = IgnoreFilter::load(fs, &self.ignore_patterns);
        let live = collect(fs, "", &|path, kind| is_backed_up(&filter, path, kind))
            .context("Failed to enumerate project tree")?;

        let removals = stale_paths(&live, &snapshot);
        let mut progress = PercentProgress::new(progress, removals.len() + snapshot.len());
        progress.start();

        let mut summary = RestoreSummary::default();

        for (path, kind) in &removals {
            match remove_stale(fs, path, *kind) {
                Ok(true) => summary.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to remove path");
                    summary.failed += 1;
                }
            }
            progress.advance();
        }

        // BTreeMap order puts every directory before its contents
        for (path, kind) in &snapshot {
            let result = if kind.is_dir() {
                fs.create_dir_all(path)
            } else {
                copy_file(fs, &fs::join(&version_dir, path), path)
            };
            match result {
                Ok(()) if !kind.is_dir() => summary.restored += 1,
                Ok(()) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to restore path");
                    summary.failed += 1;
                }
            }
            progress.advance();
        }
        progress.finish();

        info!(
            deleted = summary.deleted,
            restored = summary.restored,
            failed = summary.failed,
            "Restore complete"
        );
        Ok(summary)
    }

    /// Removes a version folder and everything in it.
    ///
    /// # Errors
    /// Returns an error if the id is invalid or the folder cannot be removed.
    pub fn delete_version(&self, fs: &dyn FileSystem, version_id: &str) -> Result<()> {
        validate_version_id(version_id)?;

        fs.remove(&fs::join(METADATA_DIR, version_id))
            .with_context(|| format!("Failed to delete version: {version_id}"))?;

        info!(version = %version_id, "Version deleted");
        Ok(())
    }
}

/// Rejects ids that are not a single plain folder name.
///
/// # Errors
/// Returns an error for empty ids, ids containing a separator and ids
/// containing `..`.
pub fn validate_version_id(version_id: &str) -> Result<()> {
    if version_id.is_empty()
        || version_id == "."
        || version_id.contains("..")
        || version_id.contains(['/', '\\'])
    {
        anyhow::bail!("Invalid version id: {version_id:?}");
    }
    Ok(())
}

fn read_descriptor(fs: &dyn FileSystem, folder: &str) -> Result<VersionInfo> {
    let path = fs::join(&fs::join(METADATA_DIR, folder), VERSION_DESCRIPTOR);
    let bytes = fs.read(&path).context("Failed to read version descriptor")?;
    serde_json::from_slice(&bytes).context("Failed to parse version descriptor")
}

/// Picks a folder name for `time`, adding `_001`, `_002`, ... if a backup
/// from the same second already exists.
fn allocate_folder(fs: &dyn FileSystem, time: DateTime<Utc>) -> Result<String> {
    let base = time.format(FOLDER_FORMAT).to_string();
    if !fs.exists(&fs::join(METADATA_DIR, &base)) {
        return Ok(base);
    }

    for n in 1..=MAX_COLLISIONS {
        let candidate = format!("{base}_{n:03}");
        if !fs.exists(&fs::join(METADATA_DIR, &candidate)) {
            debug!(folder = %candidate, "Version folder name collided, using suffix");
            return Ok(candidate);
        }
    }

    anyhow::bail!("Too many versions created at {base}")
}

/// Whether a live path belongs in a snapshot.
fn is_backed_up(filter: &IgnoreFilter, path: &str, kind: EntryKind) -> bool {
    let name = fs::file_name(path);
    if name == METADATA_DIR || VCS_DIRS.contains(&name) {
        return false;
    }
    filter.should_include(path, kind.is_dir())
}

/// Every path below `base` that `include` accepts, relative to `base`.
///
/// Rejected directories are not descended into. Only a failure to list
/// `base` itself is an error; unreadable subdirectories are skipped.
fn collect(
    fs: &dyn FileSystem,
    base: &str,
    include: &dyn Fn(&str, EntryKind) -> bool,
) -> io::Result<BTreeMap<String, EntryKind>> {
    let mut paths = BTreeMap::new();
    let mut pending = vec![String::new()];

    while let Some(dir) = pending.pop() {
        let listed = match (base.is_empty(), dir.is_empty()) {
            (true, _) => dir.clone(),
            (false, true) => base.to_string(),
            (false, false) => fs::join(base, &dir),
        };
        let children = match fs.read_dir(&listed) {
            Ok(children) => children,
            Err(e) if dir.is_empty() => return Err(e),
            Err(e) => {
                warn!(dir = %dir, error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        for child in children {
            let path = fs::join(&dir, &child.name);
            if !include(&path, child.kind) {
                continue;
            }
            if child.kind.is_dir() {
                pending.push(path.clone());
            }
            paths.insert(path, child.kind);
        }
    }

    Ok(paths)
}

/// Live paths to remove before copying `snapshot` back: every path that is
/// missing from the snapshot or has a different kind there, ordered so that
/// each directory comes after everything inside it.
fn stale_paths(
    live: &BTreeMap<String, EntryKind>,
    snapshot: &BTreeMap<String, EntryKind>,
) -> Vec<(String, EntryKind)> {
    // A path sorts after its parent, so reverse order is deepest first
    live.iter()
        .rev()
        .filter(|(path, kind)| snapshot.get(*path) != Some(*kind))
        .map(|(path, kind)| (path.clone(), *kind))
        .collect()
}

/// Removes one stale path. Returns `Ok(false)` when there was nothing to
/// remove or a directory still holds excluded entries.
fn remove_stale(fs: &dyn FileSystem, path: &str, kind: EntryKind) -> io::Result<bool> {
    if kind.is_dir() {
        match fs.read_dir(path) {
            Ok(children) if !children.is_empty() => {
                debug!(
                    path = %path,
                    remaining = children.len(),
                    "Keeping directory with excluded entries"
                );
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        }
    }
    match fs.remove(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copies a file's bytes and permissions.
fn copy_file(fs: &dyn FileSystem, from: &str, to: &str) -> io::Result<()> {
    let bytes = fs.read(from)?;
    let parent = fs::parent(to);
    if !parent.is_empty() && !fs.exists(parent) {
        fs.create_dir_all(parent)?;
    }
    fs.write(to, &bytes)?;
    if let Some(mode) = fs.permissions(from)? {
        fs.set_permissions(to, mode)?;
    }
    Ok(())
}
