//! Capability-scoped filesystem access.
//!
//! Every engine component reaches the project tree through the [`FileSystem`]
//! trait. Paths are relative, "/"-joined strings and the empty string names
//! the root, so an implementation can never be asked for anything outside the
//! directory it was opened on.
//!
//! - [`LocalFs`]: a directory on the host filesystem
//! - [`MemoryFs`]: an in-memory tree, used by tests and embedders

/// Host filesystem capability rooted at one directory.
pub mod local;
/// In-memory filesystem with failure injection.
pub mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;

use serde::{Deserialize, Serialize};
use std::io;

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Returns `true` for [`EntryKind::Directory`].
    #[must_use]
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// A child returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name of the child (no separators)
    pub name: String,
    /// Whether the child is a file or a directory
    pub kind: EntryKind,
}

/// Metadata of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time in milliseconds since the Unix epoch, if known
    pub modified: Option<i64>,
}

/// Access to one sandboxed directory tree.
///
/// Implementations must treat `""` as the root and reject any path that
/// would resolve outside of it.
pub trait FileSystem: Send + Sync {
    /// Lists the immediate children of a directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be enumerated.
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>>;

    /// Reads the metadata of a file or directory.
    ///
    /// # Errors
    /// Returns an error if the entry does not exist or cannot be accessed.
    fn metadata(&self, path: &str) -> io::Result<Metadata>;

    /// Reads the full byte content of a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Creates or truncates a file and writes `contents` to it.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// Creates a directory and any missing ancestors.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&self, path: &str) -> io::Result<()>;

    /// Removes a file, or a directory together with everything below it.
    ///
    /// # Errors
    /// Returns an error if the entry does not exist or cannot be removed.
    fn remove(&self, path: &str) -> io::Result<()>;

    /// Unix permission bits of an entry, or `None` where the implementation
    /// does not track them.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be accessed.
    fn permissions(&self, path: &str) -> io::Result<Option<u32>> {
        self.metadata(path).map(|_| None)
    }

    /// Applies permission bits read with [`FileSystem::permissions`].
    ///
    /// # Errors
    /// Returns an error if the entry cannot be accessed or changed.
    fn set_permissions(&self, path: &str, mode: u32) -> io::Result<()> {
        let _ = mode;
        self.metadata(path).map(|_| ())
    }

    /// Returns `true` if the entry exists and is accessible.
    fn exists(&self, path: &str) -> bool {
        self.metadata(path).is_ok()
    }

    /// Reads a file and decodes it as UTF-8.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid UTF-8.
    fn read_to_string(&self, path: &str) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Joins a child name onto a relative directory path.
#[must_use]
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Returns the parent of a relative path (`""` for top-level entries).
#[must_use]
pub fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Returns the last component of a relative path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Returns the lower-cased extension of a path's file name, if it has one.
///
/// Leading dots do not start an extension, so `.gitignore` has none.
#[must_use]
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let trimmed = name.trim_start_matches('.');
    trimmed
        .rfind('.')
        .map(|idx| trimmed[idx + 1..].to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Returns `true` if `path` equals `ancestor` or lies below it.
#[must_use]
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Splits a relative path into validated components.
///
/// # Errors
/// Returns `PermissionDenied` for empty, `.` or `..` components and for
/// backslashes, which could otherwise be used to step outside the root.
pub fn components(path: &str) -> io::Result<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('/')
        .map(|part| {
            if part.is_empty() || part == "." || part == ".." || part.contains('\\') {
                Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("path escapes the capability root: {path}"),
                ))
            } else {
                Ok(part)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_split() {
        assert_eq!(join("", "a.txt"), "a.txt");
        assert_eq!(join("src", "lib.rs"), "src/lib.rs");
        assert_eq!(parent("src/lib.rs"), "src");
        assert_eq!(parent("a.txt"), "");
        assert_eq!(file_name("src/nested/mod.rs"), "mod.rs");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("src/Main.RS").as_deref(), Some("rs"));
        assert_eq!(extension(".gitignore"), None);
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("Makefile"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("src/lib.rs", "src"));
        assert!(is_within("src", "src"));
        assert!(!is_within("srcfoo/lib.rs", "src"));
        assert!(is_within("anything", ""));
    }

    #[test]
    fn test_components_rejects_escapes() {
        assert!(components("../etc/passwd").is_err());
        assert!(components("a//b").is_err());
        assert!(components("a/./b").is_err());
        assert_eq!(components("a/b").unwrap(), vec!["a", "b"]);
        assert!(components("").unwrap().is_empty());
    }
}
