#![warn(missing_docs)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Counters and percentages cannot overflow
#![allow(clippy::float_arithmetic)] // Required for size formatting
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # Treelens - Project Tree Awareness
//!
//! Treelens scans a directory under gitignore rules, reports what changed
//! between two scans as unified patches, watches the tree for edits and
//! keeps manual point-in-time versions that can be restored.
//!
//! ## Architecture
//!
//! - [`fs`]: capability-scoped filesystem access (host directory or in-memory)
//! - [`scanner`]: ignore rules and recursive scanning into a [`ScanResult`](scanner::ScanResult)
//! - [`diff`]: scan comparison into a [`ChangeReport`](diff::ChangeReport)
//! - [`observer`]: native change notification with a polling fallback
//! - [`versions`]: snapshot backup, listing, restore and deletion
//! - [`workspace`]: all of the above for one tree, with operations serialized
//! - [`output`]: terminal output and the plain-text report
//! - [`config`]: TOML configuration
//!
//! ## Example Usage
//!
//! ```no_run
//! use treelens::ProjectContext;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = ProjectContext::new(".".into())?;
//! let workspace = ctx.workspace()?;
//!
//! // The first refresh lists every file
//! let baseline = workspace.refresh();
//! println!("{}", baseline.project_structure);
//!
//! // Later refreshes report changes
//! let report = workspace.refresh();
//! println!("{} changes", report.change_count());
//!
//! let id = workspace.create_backup("before refactor", &mut |_| {})?;
//! workspace.restore(&id, &mut |_| {})?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Command implementations for the `tlens` binary.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Scan comparison, unified patches and tree rendering.
pub mod diff;

/// Filesystem capability trait and implementations.
pub mod fs;

/// Change observation (native and polling).
pub mod observer;

/// Output formatting, progress display and report rendering.
pub mod output;

/// Ignore rules and recursive scanning.
pub mod scanner;

/// Version snapshots.
pub mod versions;

/// Serialized access to one project tree.
pub mod workspace;

use anyhow::{Context, Result};
use std::path::PathBuf;

pub use workspace::Workspace;

/// Current version of the treelens binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved directory holding version snapshots; never scanned or backed up.
pub const METADATA_DIR: &str = ".treelens";

/// Ignore rules file read from the project root.
pub const IGNORE_FILE: &str = ".gitignore";

/// Descriptor file at the top of every version folder.
pub const VERSION_DESCRIPTOR: &str = ".treelens-version.json";

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/treelens/config.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "TREELENS_CONFIG_PATH";

/// Central context for `tlens` commands.
///
/// Holds the project root and the loaded configuration.
///
/// ```no_run
/// use treelens::ProjectContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Configuration from $TREELENS_CONFIG_PATH or ~/.config/treelens
/// let ctx = ProjectContext::new("/srv/project".into())?;
///
/// // Explicit configuration file (for testing)
/// let ctx = ProjectContext::new_explicit(
///     "/tmp/project".into(),
///     "/tmp/treelens.toml".into(),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Directory being scanned.
    pub root: PathBuf,

    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,
}

impl ProjectContext {
    /// Creates a context, loading the configuration from the default path.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the
    /// configuration file cannot be read or created.
    pub fn new(root: PathBuf) -> Result<Self> {
        Self::new_explicit(root, default_config_path()?)
    }

    /// Creates a context with an explicit configuration file.
    ///
    /// A missing file is created with default settings.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or created.
    pub fn new_explicit(root: PathBuf, config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path).with_context(|| {
            format!(
                "Failed to load configuration: {}",
                config_path.display()
            )
        })?;

        Ok(Self {
            root,
            config_path,
            config,
        })
    }

    /// Opens the project root as a [`Workspace`].
    ///
    /// # Errors
    /// Returns an error if the root is not an accessible directory.
    pub fn workspace(&self) -> Result<Workspace> {
        Workspace::open(&self.root, &self.config)
            .with_context(|| format!("Failed to open project: {}", self.root.display()))
    }
}

/// `$TREELENS_CONFIG_PATH`, else `~/.config/treelens/config.toml`.
///
/// # Errors
/// Returns an error if neither is available.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(DEFAULT_CONFIG_PATH))
}
