//! What `tlens` prints besides its command results.
//!
//! Status lines go to stderr and are filtered by the `--quiet`/`--verbose`
//! level; stdout carries only scans, version listings and reports.
//! [`report`] renders a [`ChangeReport`](crate::diff::ChangeReport) as text.

/// Value formatting helpers.
pub mod format;
mod progress;
/// Plain-text change report rendering.
pub mod report;

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

pub use progress::Progress;
pub use report::{ReportOptions, render_report};

/// How much status output the binary prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet = 0,
    /// Status lines and progress
    Normal = 1,
    /// Per-path detail as well
    Verbose = 2,
}

impl Verbosity {
    /// Level selected by the `--quiet` and `--verbose` flags.
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

/// Sets the process-wide level.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        2 => Verbosity::Verbose,
        _ => Verbosity::Normal,
    }
}

/// Green status line, hidden when quiet.
pub fn success(message: &str) {
    if verbosity() != Verbosity::Quiet {
        eprintln!("{}", message.green());
    }
}

/// Prints a failed command's error chain.
pub fn error(err: &anyhow::Error) {
    eprintln!("{} {err:#}", "Error:".red().bold());
}

/// Bold yellow line, always shown.
pub fn warning(message: &str) {
    eprintln!("{}", message.yellow().bold());
}

/// Dimmed status line, hidden when quiet.
pub fn info(message: &str) {
    if verbosity() != Verbosity::Quiet {
        eprintln!("{}", message.dimmed());
    }
}

/// Dimmed detail line, shown only when verbose.
pub fn verbose(message: &str) {
    if verbosity() == Verbosity::Verbose {
        eprintln!("{}", message.dimmed());
    }
}

/// Status line led by a bold verb, e.g. `Restored 12 files`.
pub fn action(verb: &str, message: &str) {
    if verbosity() != Verbosity::Quiet {
        eprintln!("{} {}", verb.dimmed().bold(), message);
    }
}

/// Starts a percentage display for a backup or restore.
#[must_use]
pub fn start_progress(title: &str) -> Progress {
    Progress::new(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_set_verbosity() {
        for level in [Verbosity::Quiet, Verbosity::Verbose, Verbosity::Normal] {
            set_verbosity(level);
            assert_eq!(verbosity(), level);
        }
    }

    #[test]
    fn test_flags_pick_level() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Quiet);
        assert_eq!(Verbosity::Verbose.log_filter(), "debug");
    }
}
