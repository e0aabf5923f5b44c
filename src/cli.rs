//! Command-line interface definitions for tlens.
//!
//! The definitions are shared between the main binary and the xtask that
//! generates man pages.
//!
//! Field-level documentation doubles as clap help text, so missing_docs is
//! allowed for this module.

#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for tlens.
#[derive(Parser)]
#[command(
    name = "tlens",
    version = crate::VERSION,
    about = "Project tree scanner, change reporter and snapshot tool",
    long_about = "Scans a directory under .gitignore rules, reports changes between scans as \
                  unified diffs, watches for edits and keeps restorable point-in-time versions"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Project root to operate on
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (default: $TREELENS_CONFIG_PATH or ~/.config/treelens/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Scan the project and print its tree
    Scan {
        /// Print the scan result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the plain-text change report
    Report {
        /// Previous scan (from `tlens scan --json`) to compare against
        #[arg(long, value_name = "SCAN.json")]
        against: Option<PathBuf>,

        /// List every current file, not only changed ones
        #[arg(short, long)]
        all: bool,

        /// Append the content of every listed file
        #[arg(short, long)]
        contents: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Re-scan on every change and print what changed
    Watch,

    /// Save the current tree as a new version
    Backup {
        /// Title stored with the version
        title: String,
    },

    /// List versions, newest first
    Versions {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Make the tree match a version
    Restore {
        /// Version id as shown by `tlens versions`
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete a version
    DeleteVersion {
        /// Version id as shown by `tlens versions`
        id: String,
    },

    /// Get and set configuration values
    Config {
        /// Configuration key (e.g. report.context_lines)
        key: Option<String>,

        /// Value to set
        value: Option<String>,

        /// List all configuration values
        #[arg(short, long)]
        list: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
