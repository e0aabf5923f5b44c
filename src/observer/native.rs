use super::{EventSink, WatchCapability};
use crate::METADATA_DIR;
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Native change notification through the platform watcher
/// (inotify, FSEvents or ReadDirectoryChangesW).
///
/// Every directory is watched non-recursively; [`ChangeObserver`] decides
/// which directories are subscribed.
///
/// [`ChangeObserver`]: super::ChangeObserver
pub struct NotifyWatch {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    available: bool,
}

impl NotifyWatch {
    /// Creates a watch for the tree at `root` and probes the platform
    /// watcher once.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let available = RecommendedWatcher::new(
            |_: notify::Result<Event>| {},
            notify::Config::default(),
        )
        .map_err(|e| debug!(error = %e, "Platform watcher unavailable"))
        .is_ok();

        Self {
            root: root.into(),
            watcher: None,
            available,
        }
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        if dir.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir)
        }
    }

    fn watcher(&mut self, sink: &EventSink) -> Result<&mut RecommendedWatcher> {
        if self.watcher.is_none() {
            let root = self.root.clone();
            let sink = sink.clone();
            let watcher = RecommendedWatcher::new(
                move |res: notify::Result<Event>| match res {
                    Ok(event) if is_relevant(&root, &event) => sink.notify(),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Watch error"),
                },
                notify::Config::default(),
            )
            .context("Failed to create platform watcher")?;
            self.watcher = Some(watcher);
        }

        self.watcher
            .as_mut()
            .context("Platform watcher was not initialized")
    }
}

impl WatchCapability for NotifyWatch {
    fn is_available(&self) -> bool {
        self.available
    }

    fn subscribe(&mut self, dir: &str, sink: &EventSink) -> Result<()> {
        let path = self.resolve(dir);
        self.watcher(sink)?
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        debug!(dir = %dir, "Subscribed");
        Ok(())
    }

    fn unsubscribe(&mut self, dir: &str) -> Result<()> {
        let path = self.resolve(dir);
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .unwatch(&path)
                .with_context(|| format!("Failed to unwatch {}", path.display()))?;
        }
        Ok(())
    }

    fn unsubscribe_all(&mut self) {
        // Dropping the watcher releases every watch descriptor
        self.watcher = None;
    }
}

/// Drops access notifications and events that only touch the metadata
/// directory, both of which our own scans and backups produce.
fn is_relevant(root: &Path, event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    if event.paths.is_empty() {
        return true;
    }

    event.paths.iter().any(|path| {
        path.strip_prefix(root)
            .ok()
            .and_then(|rel| rel.components().next())
            .is_none_or(|first| first.as_os_str() != METADATA_DIR)
    })
}
