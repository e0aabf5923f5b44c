//! One project tree with its scanner, diff engine, versions and observer.
//!
//! [`Workspace`] serializes every scan and version operation behind a
//! single lock and holds the observer's pause guard while a version
//! operation runs, so a backup or restore is never reported as a burst of
//! user edits and never interleaves with a scan.

use crate::config::Config;
use crate::diff::{ChangeReport, DiffEngine};
use crate::fs::{FileSystem, LocalFs};
use crate::observer::{
    ChangeCallback, ChangeObserver, NotifyWatch, NullWatch, PauseGuard, PollingLoop,
    WatchCapability,
};
use crate::scanner::{DirectoryScanner, ScanOptions, ScanResult};
use crate::versions::{ProgressFn, RestoreSummary, VersionHistoryItem, VersionManager};
use anyhow::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A scanned and versioned project tree.
pub struct Workspace {
    fs: Arc<dyn FileSystem>,
    scanner: DirectoryScanner,
    engine: DiffEngine,
    versions: VersionManager,
    observer: Mutex<ChangeObserver>,
    /// Operation lock; also holds the most recent scan
    last_scan: Mutex<Option<ScanResult>>,
}

impl Workspace {
    /// Assembles a workspace from its capabilities.
    pub fn new(fs: Arc<dyn FileSystem>, watch: Box<dyn WatchCapability>, config: &Config) -> Self {
        let options = ScanOptions::from(&config.scan);
        Self {
            fs,
            versions: VersionManager::new(options.ignore_patterns.clone()),
            scanner: DirectoryScanner::new(options),
            engine: DiffEngine::from(&config.report),
            observer: Mutex::new(ChangeObserver::new(watch)),
            last_scan: Mutex::new(None),
        }
    }

    /// Opens a directory on the host filesystem.
    ///
    /// Native change notification is used when `watch.native` is set and
    /// the platform supports it.
    ///
    /// # Errors
    /// Returns an error if `root` is not an accessible directory.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let local = LocalFs::new(root)?;
        let watch: Box<dyn WatchCapability> = if config.watch.native {
            Box::new(NotifyWatch::new(local.root()))
        } else {
            Box::new(NullWatch)
        };
        Ok(Self::new(Arc::new(local), watch, config))
    }

    /// The filesystem capability.
    #[must_use]
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// The scanner configured for this workspace.
    #[must_use]
    pub const fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// The diff engine configured for this workspace.
    #[must_use]
    pub const fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Scans the tree and reports what changed since the previous scan.
    ///
    /// The first scan, and the first after a restore, yields the baseline
    /// report listing every file.
    pub fn refresh(&self) -> ChangeReport {
        let mut last = self.lock_operations();
        let current = self.scanner.scan(self.fs.as_ref());

        let report = match last.as_ref() {
            Some(previous) => self.engine.compare(previous, &current),
            None => self.engine.baseline(&current),
        };

        *last = Some(current);
        report
    }

    /// The most recent scan, if any.
    #[must_use]
    pub fn latest_scan(&self) -> Option<ScanResult> {
        self.lock_operations().clone()
    }

    /// Backs the tree up as a new version and returns its id.
    ///
    /// # Errors
    /// See [`VersionManager::create_backup`].
    pub fn create_backup(&self, title: &str, progress: ProgressFn<'_>) -> Result<String> {
        let _last = self.lock_operations();
        let _paused = self.pause();
        self.versions.create_backup(self.fs.as_ref(), title, progress)
    }

    /// Versions, newest first.
    ///
    /// # Errors
    /// See [`VersionManager::list_versions`].
    pub fn list_versions(&self) -> Result<Vec<VersionHistoryItem>> {
        let _last = self.lock_operations();
        self.versions.list_versions(self.fs.as_ref())
    }

    /// Restores a version and forgets the stored scan.
    ///
    /// # Errors
    /// See [`VersionManager::restore`].
    pub fn restore(&self, version_id: &str, progress: ProgressFn<'_>) -> Result<RestoreSummary> {
        let mut last = self.lock_operations();
        let _paused = self.pause();
        // Even a partial restore invalidates the stored scan
        *last = None;
        self.versions.restore(self.fs.as_ref(), version_id, progress)
    }

    /// Deletes a version.
    ///
    /// # Errors
    /// See [`VersionManager::delete_version`].
    pub fn delete_version(&self, version_id: &str) -> Result<()> {
        let _last = self.lock_operations();
        let _paused = self.pause();
        self.versions.delete_version(self.fs.as_ref(), version_id)
    }

    /// Subscribes to native change notification.
    ///
    /// Returns `false` when the caller has to poll instead, for example with
    /// [`Workspace::start_polling`]. Call again after every scan so new
    /// directories are picked up.
    pub fn start_monitoring(&self, on_change: ChangeCallback) -> bool {
        self.lock_observer()
            .start_monitoring(self.fs.as_ref(), on_change)
    }

    /// Drops every native subscription.
    pub fn stop_monitoring(&self) {
        self.lock_observer().stop_monitoring();
    }

    /// Returns `true` while native subscriptions are active.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.lock_observer().is_monitoring()
    }

    /// Starts a polling loop that version operations pause as well.
    ///
    /// # Errors
    /// See [`PollingLoop::start`].
    pub fn start_polling(&self, interval: Duration, on_change: ChangeCallback) -> Result<PollingLoop> {
        let switch = self.lock_observer().pause_switch();
        PollingLoop::start_with(interval, switch, on_change)
    }

    /// Suppresses change notifications until the guard is dropped.
    pub fn pause(&self) -> PauseGuard {
        debug!("Pausing change notifications");
        self.lock_observer().pause()
    }

    fn lock_operations(&self) -> MutexGuard<'_, Option<ScanResult>> {
        self.last_scan.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_observer(&self) -> MutexGuard<'_, ChangeObserver> {
        self.observer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
