use crate::diff::{ChangeReport, FileDiff};
use std::fmt::Write;

/// What to put in a rendered report beyond the change lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Append the captured content of every file in `all_files`
    pub include_contents: bool,
}

/// Serializes a [`ChangeReport`] into the plain-text export format.
///
/// Sections, in order: project structure, added files, deleted files,
/// modified files with their patches, and optionally every file's content.
/// Empty change sections are kept so consumers can rely on the layout.
#[must_use]
pub fn render_report(report: &ChangeReport, options: &ReportOptions) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Project Report");
    let _ = writeln!(out, "Generated: {}", report.timestamp.to_rfc3339());
    let _ = writeln!(
        out,
        "Changes: {} added, {} deleted, {} modified",
        report.added_files.len(),
        report.deleted_files.len(),
        report.modified_files.len()
    );

    let _ = writeln!(out, "\n## Project Structure\n");
    fenced(&mut out, "", &report.project_structure);

    section(&mut out, "Added Files", &report.added_files, true);
    section(&mut out, "Deleted Files", &report.deleted_files, false);
    section(&mut out, "Modified Files", &report.modified_files, true);

    if options.include_contents {
        let _ = writeln!(out, "\n## File Contents");
        match &report.all_files {
            Some(files) => {
                for file in files {
                    let _ = writeln!(out, "\n### {}\n", file.path);
                    match &file.content {
                        Some(content) => fenced(&mut out, "", content),
                        None => {
                            let _ = writeln!(out, "(content not captured)");
                        }
                    }
                }
            }
            None => {
                let _ = writeln!(out, "\n(no file listing in this report)");
            }
        }
    }

    out
}

fn section(out: &mut String, title: &str, files: &[FileDiff], with_patches: bool) {
    let _ = writeln!(out, "\n## {title} ({})", files.len());

    if files.is_empty() {
        let _ = writeln!(out, "\n(none)");
        return;
    }

    if !with_patches {
        out.push('\n');
        for file in files {
            let _ = writeln!(out, "- {}", file.path);
        }
        return;
    }

    for file in files {
        let _ = writeln!(out, "\n### {}\n", file.path);
        match &file.diff {
            Some(diff) => fenced(out, "diff", diff),
            None => {
                let _ = writeln!(out, "(no textual diff available)");
            }
        }
    }
}

/// Wraps `body` in a fence longer than any backtick run inside it.
fn fenced(out: &mut String, lang: &str, body: &str) {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);

    let _ = writeln!(out, "{fence}{lang}");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    let _ = writeln!(out, "{fence}");
}
