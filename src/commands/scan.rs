use crate::ProjectContext;
use crate::output::{self, format::format_size};
use anyhow::{Context, Result};
use colored::Colorize;

/// Execute scan command: print the tree and a summary, or the raw scan
///
/// # Errors
///
/// Returns an error if:
/// - The project root cannot be opened
/// - JSON serialization fails
pub fn execute(ctx: &ProjectContext, json: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let scan = workspace.scanner().scan(workspace.fs());

    if json {
        let text = serde_json::to_string_pretty(&scan).context("Failed to serialize scan")?;
        println!("{text}");
        return Ok(());
    }

    print!("{}", crate::diff::render_tree(&scan.entries));

    let files = scan.files().count();
    let directories = scan.directories().count();
    let captured = scan.files().filter(|f| f.content.is_some()).count();
    let bytes: u64 = scan.files().filter_map(|f| f.size).sum();

    println!();
    println!(
        "{} files ({}), {} directories, {} with captured content",
        files.to_string().bold(),
        format_size(bytes),
        directories.to_string().bold(),
        captured
    );
    output::verbose(&format!("Scanned at {}", scan.timestamp.to_rfc3339()));

    Ok(())
}
