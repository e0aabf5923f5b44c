#![allow(dead_code)]

use anyhow::Result;
use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use treelens::{METADATA_DIR, ProjectContext, Workspace};
use walkdir::WalkDir;

/// A project directory plus a private configuration file
pub struct TestProject {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub config_path: PathBuf,
}

impl TestProject {
    /// Create an empty project with a default configuration
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("project");
        fs::create_dir(&root)?;
        let root = root.canonicalize()?;
        let config_path = temp_dir.path().join("config.toml");

        Ok(Self {
            temp_dir,
            root,
            config_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write a file relative to the root, creating parent directories
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn read(&self, rel: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.root.join(rel))?)
    }

    pub fn remove(&self, rel: &str) -> Result<()> {
        let path = self.root.join(rel);
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Set a file's modification time to `secs` after the Unix epoch
    pub fn set_mtime(&self, rel: &str, secs: i64) -> Result<()> {
        filetime::set_file_mtime(self.root.join(rel), FileTime::from_unix_time(secs, 0))?;
        Ok(())
    }

    pub fn context(&self) -> Result<ProjectContext> {
        ProjectContext::new_explicit(self.root.clone(), self.config_path.clone())
    }

    pub fn workspace(&self) -> Result<Workspace> {
        self.context()?.workspace()
    }

    /// Every file outside the metadata directory, with its bytes
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != METADATA_DIR)
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                (rel, fs::read(entry.path()).unwrap())
            })
            .collect()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new().expect("Failed to create test project")
    }
}
