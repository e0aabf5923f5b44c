use colored::Colorize;
use std::io::{self, IsTerminal, Write};

/// A percentage display that updates in place on TTY terminals.
///
/// Fed from the `0..=100` callbacks of backup and restore:
/// "Restoring: 100%, done."
pub struct Progress {
    /// Title displayed before the percentage
    title: String,
    /// Whether stderr is a TTY (enables inline updating)
    is_tty: bool,
    /// Last displayed percentage
    last_percent: Option<u8>,
}

impl Progress {
    /// Creates a display with the given title.
    ///
    /// If stderr is not a TTY the display stays silent.
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            is_tty: io::stderr().is_terminal(),
            last_percent: None,
        }
    }

    /// Records a percentage, clamped to 100. Redraws only on change.
    pub fn update(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        if self.is_tty {
            self.display(percent);
        }
    }

    /// Last percentage passed to [`Progress::update`].
    #[must_use]
    pub const fn percent(&self) -> Option<u8> {
        self.last_percent
    }

    /// Completes the display with a final "done" line.
    pub fn finish(mut self) {
        if self.is_tty && self.last_percent.is_some() {
            eprintln!("\r{}: 100%, done.", self.title.dimmed());
        }
        // Nothing left for Drop to terminate
        self.is_tty = false;
    }

    fn display(&self, percent: u8) {
        eprint!("\r{}: {}%", self.title.dimmed(), percent.to_string().dimmed());
        let _ = io::stderr().flush();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        if self.is_tty && self.last_percent.is_some_and(|p| p < 100) {
            eprintln!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_initial_state() {
        let progress = Progress::new("Test");
        assert_eq!(progress.percent(), None);
    }

    #[test]
    fn test_progress_update() {
        let mut progress = Progress::new("Test");

        progress.update(0);
        assert_eq!(progress.percent(), Some(0));

        progress.update(75);
        assert_eq!(progress.percent(), Some(75));
        progress.finish();
    }

    #[test]
    fn test_progress_clamps() {
        let mut progress = Progress::new("Test");
        progress.update(250);
        assert_eq!(progress.percent(), Some(100));
    }
}
