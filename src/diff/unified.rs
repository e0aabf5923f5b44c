use similar::{Algorithm, ChangeTag, TextDiff};
use std::fmt::Write;
use tracing::{Level, debug, span};

/// Configuration for unified diff generation
#[derive(Debug, Clone, Copy)]
pub struct UnifiedDiffConfig {
    /// Number of context lines around changes (typically 3)
    pub context_lines: usize,
    /// Diff algorithm to use (Myers, Patience)
    pub algorithm: Algorithm,
}

impl Default for UnifiedDiffConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            algorithm: Algorithm::Myers,
        }
    }
}

/// Header label for the side of a patch that does not exist.
pub const NULL_PATH: &str = "/dev/null";

/// Generate a unified diff between two file contents.
///
/// Produces Git-style unified diff text with:
/// - File headers (`--- a/path` and `+++ b/path`)
/// - Hunk headers (`@@ -10,7 +10,9 @@`)
/// - Context lines (unchanged, prefixed with space)
/// - Deletion lines (prefixed with `-`)
/// - Addition lines (prefixed with `+`)
///
/// `old_path` may be [`NULL_PATH`] for a file that is being created, in
/// which case the header is not given the `a/` prefix. A line without a
/// trailing newline is followed by `\ No newline at end of file`.
#[must_use]
pub fn generate_unified_diff(
    old_content: &str,
    new_content: &str,
    old_path: &str,
    new_path: &str,
    config: &UnifiedDiffConfig,
) -> String {
    let span = span!(
        Level::DEBUG,
        "diff_generation",
        path = new_path,
        algorithm = ?config.algorithm,
        context = config.context_lines
    );
    let _guard = span.enter();

    let diff = TextDiff::configure()
        .algorithm(config.algorithm)
        .diff_lines(old_content, new_content);

    let mut out = String::new();

    // Git-style file headers
    if old_path == NULL_PATH {
        let _ = writeln!(out, "--- {NULL_PATH}");
    } else {
        let _ = writeln!(out, "--- a/{old_path}");
    }
    let _ = writeln!(out, "+++ b/{new_path}");

    let mut total_changes = 0;

    for hunk in diff
        .unified_diff()
        .context_radius(config.context_lines)
        .iter_hunks()
    {
        // Hunk header (e.g., "@@ -10,7 +10,9 @@")
        let _ = writeln!(out, "{}", hunk.header());

        for change in hunk.iter_changes() {
            let prefix = match change.tag() {
                ChangeTag::Delete => {
                    total_changes += 1;
                    '-'
                }
                ChangeTag::Insert => {
                    total_changes += 1;
                    '+'
                }
                ChangeTag::Equal => ' ',
            };

            let _ = write!(out, "{prefix}{}", change.value());
            if change.missing_newline() {
                let _ = writeln!(out);
                let _ = writeln!(out, "\\ No newline at end of file");
            }
        }
    }

    debug!(path = new_path, changes = total_changes, "Diff generation complete");

    out
}

/// Returns `true` if a patch produced by [`generate_unified_diff`] contains
/// at least one hunk.
#[must_use]
pub fn has_hunks(patch: &str) -> bool {
    patch.lines().any(|line| line.starts_with("@@"))
}
