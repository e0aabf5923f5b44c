//! Gitignore-dialect inclusion predicate.
//!
//! Rules come from two places: patterns configured for every project
//! (`scan.ignore_patterns`) and the project's own `.gitignore`. Configured
//! patterns are added first, so the project file can re-include a path with
//! `!pattern`. Any problem reading or compiling the rules fails open.

use crate::IGNORE_FILE;
use crate::fs::FileSystem;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::io;
use tracing::{debug, warn};

/// Decides which relative paths belong to the project inventory.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    /// Compiled rules; `None` includes everything
    matcher: Option<Gitignore>,
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::include_all()
    }
}

impl IgnoreFilter {
    /// A filter that includes every path.
    #[must_use]
    pub const fn include_all() -> Self {
        Self { matcher: None }
    }

    /// Compiles rule text plus extra patterns into a filter.
    ///
    /// Lines that fail to compile are skipped with a warning. If the whole
    /// set cannot be built the filter includes everything.
    #[must_use]
    pub fn from_rules(rules: &str, extra_patterns: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(".");

        for line in extra_patterns.iter().map(String::as_str).chain(rules.lines()) {
            if let Err(e) = builder.add_line(None, line) {
                warn!(pattern = line, error = %e, "Skipping invalid ignore pattern");
            }
        }

        match builder.build() {
            Ok(matcher) if matcher.is_empty() => Self::include_all(),
            Ok(matcher) => Self {
                matcher: Some(matcher),
            },
            Err(e) => {
                warn!(error = %e, "Failed to compile ignore rules, including everything");
                Self::include_all()
            }
        }
    }

    /// Loads the root's ignore file through a filesystem capability.
    ///
    /// A missing or unreadable ignore file is not an error: only
    /// `extra_patterns` apply in that case.
    #[must_use]
    pub fn load(fs: &dyn FileSystem, extra_patterns: &[String]) -> Self {
        let rules = match fs.read(IGNORE_FILE) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No ignore file found");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read ignore file, ignoring it");
                String::new()
            }
        };

        Self::from_rules(&rules, extra_patterns)
    }

    /// Returns `true` if `path` (and every directory above it) is included.
    ///
    /// `is_dir` selects whether directory-only patterns (`build/`) apply to
    /// the path itself.
    #[must_use]
    pub fn should_include(&self, path: &str, is_dir: bool) -> bool {
        let Some(matcher) = &self.matcher else {
            return true;
        };
        if path.is_empty() {
            return true;
        }

        !matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn rule_count(&self) -> u64 {
        self.matcher.as_ref().map_or(0, Gitignore::num_ignores)
    }
}
