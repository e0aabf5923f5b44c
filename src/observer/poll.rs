use super::{ChangeCallback, PauseGuard, PauseSwitch};
use anyhow::{Context, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Caller-owned timer that requests a re-scan every interval.
///
/// The fallback when [`ChangeObserver::start_monitoring`] returns `false`.
/// The loop stops when [`PollingLoop::stop`] is called or the value is
/// dropped. Neither may be done from inside `on_change`, which runs on the
/// polling thread.
///
/// [`ChangeObserver::start_monitoring`]: super::ChangeObserver::start_monitoring
pub struct PollingLoop {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    pause: PauseSwitch,
    interval: Duration,
}

impl PollingLoop {
    /// Starts a thread that calls `on_change(false)` every `interval`.
    ///
    /// # Errors
    /// Returns an error if the interval is zero or the thread cannot be
    /// spawned.
    pub fn start(interval: Duration, on_change: ChangeCallback) -> Result<Self> {
        Self::start_with(interval, PauseSwitch::default(), on_change)
    }

    /// Like [`PollingLoop::start`], with ticks suppressed whenever `pause`
    /// is held. Sharing an observer's switch lets one guard silence both.
    ///
    /// # Errors
    /// Returns an error if the interval is zero or the thread cannot be
    /// spawned.
    pub fn start_with(
        interval: Duration,
        pause: PauseSwitch,
        on_change: ChangeCallback,
    ) -> Result<Self> {
        if interval.is_zero() {
            anyhow::bail!("Polling interval must be greater than zero");
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let paused = pause.clone();

        let handle = thread::Builder::new()
            .name("treelens-poll".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !paused.is_paused() {
                                on_change(false);
                            }
                        }
                        // Explicit stop or the owner went away
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .context("Failed to spawn polling thread")?;

        debug!(interval = ?interval, "Polling started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            pause,
            interval,
        })
    }

    /// The tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Suppresses ticks until the returned guard is dropped.
    pub fn pause(&self) -> PauseGuard {
        self.pause.pause()
    }

    /// Stops the loop and waits for the polling thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("Polling thread panicked");
            }
            debug!("Polling stopped");
        }
    }
}

impl Drop for PollingLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
