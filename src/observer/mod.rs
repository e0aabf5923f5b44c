//! Filesystem change observation.
//!
//! [`ChangeObserver`] subscribes an injected [`WatchCapability`] to the root
//! and every directory below it. When no native mechanism is available it
//! reports so and the caller drives re-scans with a [`PollingLoop`] instead.
//!
//! Subscriptions are per directory. A directory created after
//! [`ChangeObserver::start_monitoring`] is not watched until the observer is
//! started again, which callers do after every completed scan.

/// Native notification backed by the `notify` crate.
pub mod native;
/// Timer-driven fallback.
pub mod poll;

pub use native::NotifyWatch;
pub use poll::PollingLoop;

use crate::METADATA_DIR;
use crate::fs::{self, FileSystem};
use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Change notification callback. The argument is `true` for native
/// notifications and `false` for polling ticks.
pub type ChangeCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Counter-based pause switch shared between an event source and its owner.
#[derive(Debug, Clone, Default)]
pub struct PauseSwitch(Arc<AtomicUsize>);

impl PauseSwitch {
    /// Suppresses notifications until the returned guard is dropped.
    #[must_use]
    pub fn pause(&self) -> PauseGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        PauseGuard(self.clone())
    }

    /// Returns `true` while at least one guard is alive.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// Keeps notifications suppressed while alive.
#[derive(Debug)]
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct PauseGuard(PauseSwitch);

impl Drop for PauseGuard {
    fn drop(&mut self) {
        (self.0).0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Shared {
    callback: Mutex<Option<ChangeCallback>>,
    pause: PauseSwitch,
    delivered: AtomicU64,
}

/// Handle a [`WatchCapability`] uses to deliver native notifications.
#[derive(Clone)]
pub struct EventSink {
    shared: Arc<Shared>,
}

impl EventSink {
    /// Forwards one native notification to the current callback.
    ///
    /// Dropped while the observer is paused or stopped.
    pub fn notify(&self) {
        if self.shared.pause.is_paused() {
            debug!("Observer paused, dropping notification");
            return;
        }

        let callback = self
            .shared
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(callback) = callback {
            self.shared.delivered.fetch_add(1, Ordering::Relaxed);
            callback(true);
        }
    }
}

/// A host facility that can report changes inside a directory.
pub trait WatchCapability: Send {
    /// Probes whether the facility works on this host.
    fn is_available(&self) -> bool;

    /// Starts reporting changes to the immediate children of `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be watched.
    fn subscribe(&mut self, dir: &str, sink: &EventSink) -> Result<()>;

    /// Stops reporting changes for `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory was not being watched.
    fn unsubscribe(&mut self, dir: &str) -> Result<()>;

    /// Drops every subscription.
    fn unsubscribe_all(&mut self);
}

impl<W: WatchCapability + ?Sized> WatchCapability for Box<W> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn subscribe(&mut self, dir: &str, sink: &EventSink) -> Result<()> {
        (**self).subscribe(dir, sink)
    }

    fn unsubscribe(&mut self, dir: &str) -> Result<()> {
        (**self).unsubscribe(dir)
    }

    fn unsubscribe_all(&mut self) {
        (**self).unsubscribe_all();
    }
}

/// A capability for hosts without native change notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWatch;

impl WatchCapability for NullWatch {
    fn is_available(&self) -> bool {
        false
    }

    fn subscribe(&mut self, dir: &str, _sink: &EventSink) -> Result<()> {
        anyhow::bail!("Native change notification is unavailable (directory: {dir:?})")
    }

    fn unsubscribe(&mut self, _dir: &str) -> Result<()> {
        Ok(())
    }

    fn unsubscribe_all(&mut self) {}
}

/// Owns the native subscriptions for one tree.
///
/// Dropping the observer tears every subscription down.
pub struct ChangeObserver<W: WatchCapability = Box<dyn WatchCapability>> {
    watch: W,
    shared: Arc<Shared>,
    /// Directories currently subscribed, by relative path
    subscribed: BTreeSet<String>,
}

impl<W: WatchCapability> ChangeObserver<W> {
    /// Creates an idle observer.
    pub fn new(watch: W) -> Self {
        Self {
            watch,
            shared: Arc::new(Shared {
                callback: Mutex::new(None),
                pause: PauseSwitch::default(),
                delivered: AtomicU64::new(0),
            }),
            subscribed: BTreeSet::new(),
        }
    }

    /// Subscribes to the root and every directory below it.
    ///
    /// Returns `false` if native notification is unavailable or any
    /// subscription fails; in that case nothing stays subscribed and the
    /// caller has to poll. Calling it again replaces the callback,
    /// subscribes directories that appeared since, and drops directories
    /// that disappeared. Already-subscribed directories are left alone.
    pub fn start_monitoring(&mut self, fs: &dyn FileSystem, on_change: ChangeCallback) -> bool {
        if !self.watch.is_available() {
            info!("Native change notification unavailable, caller must poll");
            self.stop_monitoring();
            return false;
        }

        let directories = collect_directories(fs);
        *self
            .shared
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(on_change);

        let sink = EventSink {
            shared: Arc::clone(&self.shared),
        };

        for dir in &directories {
            if self.subscribed.contains(dir) {
                continue;
            }
            if let Err(e) = self.watch.subscribe(dir, &sink) {
                warn!(dir = %dir, error = %e, "Native subscription failed, falling back to polling");
                self.stop_monitoring();
                return false;
            }
            self.subscribed.insert(dir.clone());
        }

        let stale: Vec<String> = self.subscribed.difference(&directories).cloned().collect();
        for dir in stale {
            if let Err(e) = self.watch.unsubscribe(&dir) {
                debug!(dir = %dir, error = %e, "Failed to unsubscribe vanished directory");
            }
            self.subscribed.remove(&dir);
        }

        info!(directories = self.subscribed.len(), "Native monitoring active");
        true
    }

    /// Tears down every subscription. Safe to call when idle.
    pub fn stop_monitoring(&mut self) {
        if !self.subscribed.is_empty() {
            debug!(directories = self.subscribed.len(), "Stopping native monitoring");
        }
        self.watch.unsubscribe_all();
        self.subscribed.clear();
        *self
            .shared
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns `true` while native subscriptions are active.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        !self.subscribed.is_empty()
    }

    /// Directories currently subscribed.
    #[must_use]
    pub fn subscribed(&self) -> &BTreeSet<String> {
        &self.subscribed
    }

    /// Number of notifications delivered to callbacks so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.shared.delivered.load(Ordering::Relaxed)
    }

    /// Suppresses notifications until the returned guard is dropped.
    pub fn pause(&self) -> PauseGuard {
        self.shared.pause.pause()
    }

    /// The switch behind [`ChangeObserver::pause`].
    #[must_use]
    pub fn pause_switch(&self) -> PauseSwitch {
        self.shared.pause.clone()
    }
}

impl<W: WatchCapability> Drop for ChangeObserver<W> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// The root and every directory below it, except the metadata directory.
fn collect_directories(fs: &dyn FileSystem) -> BTreeSet<String> {
    let mut directories = BTreeSet::new();
    let mut pending = vec![String::new()];

    while let Some(dir) = pending.pop() {
        let children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(e) => {
                warn!(dir = %dir, error = %e, "Failed to list directory for watching");
                continue;
            }
        };

        for child in children {
            if child.kind.is_dir() && child.name != METADATA_DIR {
                pending.push(fs::join(&dir, &child.name));
            }
        }
        directories.insert(dir);
    }

    directories
}
