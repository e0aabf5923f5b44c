//! Implementations of the `tlens` subcommands.
//!
//! Each submodule exposes `execute`-style functions taking a
//! [`ProjectContext`](crate::ProjectContext); `main` only parses arguments
//! and dispatches.

/// `tlens config`
pub mod config;
/// `tlens report`
pub mod report;
/// `tlens scan`
pub mod scan;
/// `tlens backup`, `versions`, `restore` and `delete-version`
pub mod versions;
/// `tlens watch`
pub mod watch;

use crate::diff::ChangeReport;
use crate::output::format::format_change;

/// Prints one `A`/`D`/`M` line per changed file.
pub fn print_changes(report: &ChangeReport) {
    for file in report
        .added_files
        .iter()
        .chain(&report.deleted_files)
        .chain(&report.modified_files)
    {
        println!("{}", format_change(file.kind, &file.path));
    }
}
