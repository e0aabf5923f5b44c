use crate::ProjectContext;
use crate::output::{self, ReportOptions, render_report};
use crate::scanner::ScanResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Arguments of the report command.
#[derive(Debug, Clone, Default)]
pub struct ReportArgs {
    /// Previous scan to compare against; none renders the baseline
    pub against: Option<PathBuf>,
    /// List every current file
    pub all: bool,
    /// Append file contents
    pub contents: bool,
    /// Destination file; none prints to stdout
    pub output: Option<PathBuf>,
}

/// Execute report command
///
/// # Errors
///
/// Returns an error if:
/// - The project root cannot be opened
/// - The previous scan cannot be read or parsed
/// - The report cannot be written
pub fn execute(ctx: &ProjectContext, args: &ReportArgs) -> Result<()> {
    let workspace = ctx.workspace()?;
    let previous = args.against.as_deref().map(load_scan).transpose()?;
    let current = workspace.scanner().scan(workspace.fs());
    let engine = workspace.engine();

    let options = ReportOptions {
        include_contents: args.contents || ctx.config.report.include_contents,
    };

    // The contents section is rendered from the full file listing
    let report = match &previous {
        Some(previous) if args.all || options.include_contents => {
            engine.compare_with_all_files(previous, &current)
        }
        Some(previous) => engine.compare(previous, &current),
        None => engine.baseline(&current),
    };
    let text = render_report(&report, &options);

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            output::success(&format!(
                "Wrote report with {} changes to {}",
                report.change_count(),
                path.display()
            ));
        }
        None => print!("{text}"),
    }

    Ok(())
}

fn load_scan(path: &Path) -> Result<ScanResult> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read scan: {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse scan: {}", path.display()))
}
