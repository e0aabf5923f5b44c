use crate::ProjectContext;
use crate::output::{
    self,
    format::{format_relative_time, format_timestamp},
};
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use std::io::{self, BufRead, IsTerminal, Write};

/// Execute backup command
///
/// # Errors
///
/// Returns an error if the project cannot be opened or the backup fails.
pub fn backup(ctx: &ProjectContext, title: &str) -> Result<()> {
    let workspace = ctx.workspace()?;

    let mut progress = output::start_progress("Backing up");
    let id = workspace.create_backup(title, &mut |pct| progress.update(pct))?;
    progress.finish();

    output::success(&format!("Created version {id}"));
    println!("{id}");
    Ok(())
}

/// Execute versions command: list versions newest first
///
/// # Errors
///
/// Returns an error if the project cannot be opened or the metadata
/// directory cannot be read.
pub fn list(ctx: &ProjectContext, json: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let versions = workspace.list_versions()?;

    if json {
        let text =
            serde_json::to_string_pretty(&versions).context("Failed to serialize versions")?;
        println!("{text}");
        return Ok(());
    }

    if versions.is_empty() {
        output::info("No versions");
        return Ok(());
    }

    let now = Utc::now();
    for version in &versions {
        println!(
            "{}  {}  {} {}",
            version.folder_name.yellow(),
            version.version_title.bold(),
            format_timestamp(version.backup_time),
            format!("({})", format_relative_time(version.backup_time, now)).dimmed()
        );
    }

    Ok(())
}

/// Execute restore command
///
/// Asks for confirmation unless `yes` is set; without a terminal to ask on,
/// `yes` is required.
///
/// # Errors
///
/// Returns an error if:
/// - Confirmation is refused or cannot be obtained
/// - The version does not exist
/// - Either tree cannot be enumerated
pub fn restore(ctx: &ProjectContext, id: &str, yes: bool) -> Result<()> {
    let workspace = ctx.workspace()?;

    if !yes && !confirm(&format!(
        "Restore {id}? Files not in the version will be deleted and changed files overwritten."
    ))? {
        output::info("Restore cancelled");
        return Ok(());
    }

    let mut progress = output::start_progress("Restoring");
    let summary = workspace.restore(id, &mut |pct| progress.update(pct))?;
    progress.finish();

    output::action(
        "Restored",
        &format!(
            "{id}: {} files written, {} paths removed",
            summary.restored, summary.deleted
        ),
    );
    if summary.failed > 0 {
        output::warning(&format!(
            "{} paths could not be restored (run with -v for details)",
            summary.failed
        ));
    }

    Ok(())
}

/// Execute delete-version command
///
/// # Errors
///
/// Returns an error if the version cannot be removed.
pub fn delete(ctx: &ProjectContext, id: &str) -> Result<()> {
    let workspace = ctx.workspace()?;
    workspace.delete_version(id)?;
    output::success(&format!("Deleted version {id}"));
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        anyhow::bail!("Refusing to restore without confirmation; pass --yes");
    }

    eprint!("{question} [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
