use super::{DirEntry, EntryKind, FileSystem, Metadata, components};
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::{MetadataExt, PermissionsExt};

/// Mode of files created by [`LocalFs::write`] when no file existed.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// A directory on the host filesystem exposed as a [`FileSystem`].
///
/// Relative paths are validated component by component before they are
/// joined onto the root, so `..` and absolute paths are refused. Symbolic
/// links are neither followed nor listed.
#[derive(Debug, Clone)]
pub struct LocalFs {
    /// Canonical root directory
    root: PathBuf,
}

impl LocalFs {
    /// Opens a directory as a capability root.
    ///
    /// # Errors
    /// Returns an error if the path does not exist or is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = fs::canonicalize(root)
            .with_context(|| format!("Failed to open project root: {}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("Project root is not a directory: {}", root.display());
        }
        Ok(Self { root })
    }

    /// The canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path against the root.
    ///
    /// # Errors
    /// Returns `PermissionDenied` if the path would escape the root.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mut resolved = self.root.clone();
        for part in components(path)? {
            resolved.push(part);
        }
        Ok(resolved)
    }
}

fn to_millis(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
}

impl FileSystem for LocalFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let abs = self.resolve(dir)?;
        let mut children = Vec::new();

        for entry in fs::read_dir(&abs)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                continue;
            };

            match entry.file_name().into_string() {
                Ok(name) => children.push(DirEntry { name, kind }),
                Err(raw) => debug!(name = ?raw, "Skipping entry with non UTF-8 name"),
            }
        }

        Ok(children)
    }

    fn metadata(&self, path: &str) -> io::Result<Metadata> {
        let meta = fs::symlink_metadata(self.resolve(path)?)?;
        let kind = if meta.is_dir() {
            EntryKind::Directory
        } else if meta.is_file() {
            EntryKind::File
        } else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file or directory: {path}"),
            ));
        };

        Ok(Metadata {
            kind,
            size: if kind.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().ok().and_then(to_millis),
        })
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let abs = self.resolve(path)?;
        let parent = abs
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cannot write the root"))?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(contents)?;
        // The temp file is private; give it the mode the target has or would get
        match fs::symlink_metadata(&abs) {
            Ok(existing) => temp.as_file().set_permissions(existing.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                #[cfg(unix)]
                temp.as_file()
                    .set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))?;
            }
            Err(e) => return Err(e),
        }
        temp.persist(&abs).map_err(|e| e.error)?;
        Ok(())
    }

    fn create_dir_all(&self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)?)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        if path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "refusing to remove the capability root",
            ));
        }
        let abs = self.resolve(path)?;
        if fs::symlink_metadata(&abs)?.is_dir() {
            fs::remove_dir_all(abs)
        } else {
            fs::remove_file(abs)
        }
    }

    #[cfg(unix)]
    fn permissions(&self, path: &str) -> io::Result<Option<u32>> {
        let meta = fs::symlink_metadata(self.resolve(path)?)?;
        Ok(Some(meta.mode() & 0o7777))
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &str, mode: u32) -> io::Result<()> {
        fs::set_permissions(self.resolve(path)?, fs::Permissions::from_mode(mode))
    }
}
