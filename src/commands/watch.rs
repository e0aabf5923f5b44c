use super::print_changes;
use crate::ProjectContext;
use crate::observer::ChangeCallback;
use crate::output;
use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc;
use tracing::debug;

/// Execute watch command: baseline scan, then re-scan on every change
///
/// Uses native notification when available and polling otherwise. Runs
/// until the process is interrupted.
///
/// # Errors
///
/// Returns an error if:
/// - The project root cannot be opened
/// - The configured durations are invalid
/// - The polling thread cannot be started
pub fn execute(ctx: &ProjectContext) -> Result<()> {
    let workspace = ctx.workspace()?;
    let interval = ctx.config.watch.poll_interval()?;
    let debounce = ctx.config.watch.debounce()?;

    let baseline = workspace.refresh();
    let files = baseline.all_files.as_ref().map_or(0, Vec::len);
    output::info(&format!(
        "Watching {} ({files} files)",
        ctx.root.display()
    ));

    let (tx, rx) = mpsc::channel::<bool>();
    let on_change: ChangeCallback = Arc::new(move |native| {
        let _ = tx.send(native);
    });

    let mut native = workspace.start_monitoring(Arc::clone(&on_change));
    let mut polling = if native {
        output::info("Using native change notification");
        None
    } else {
        output::info(&format!(
            "Native change notification unavailable, polling every {}",
            humantime::format_duration(interval)
        ));
        Some(workspace.start_polling(interval, Arc::clone(&on_change))?)
    };

    while let Ok(from_native) = rx.recv() {
        // Collapse a burst of notifications into one scan
        let mut burst = 1usize;
        while rx.recv_timeout(debounce).is_ok() {
            burst += 1;
        }
        debug!(native = from_native, events = burst, "Change detected");

        let report = workspace.refresh();
        if report.is_empty() {
            output::verbose("No changes");
        } else {
            output::action(
                "Changed",
                &format!(
                    "{} added, {} deleted, {} modified",
                    report.added_files.len(),
                    report.deleted_files.len(),
                    report.modified_files.len()
                ),
            );
            print_changes(&report);
        }

        // Pick up directories created since the last subscription
        if native && !workspace.start_monitoring(Arc::clone(&on_change)) {
            output::warning("Native change notification failed, falling back to polling");
            native = false;
            polling.get_or_insert(workspace.start_polling(interval, Arc::clone(&on_change))?);
        }
    }

    workspace.stop_monitoring();
    drop(polling);
    Ok(())
}
