use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use treelens::Workspace;
use treelens::config::Config;
use treelens::fs::{FileSystem, MemoryFs};
use treelens::observer::{
    ChangeCallback, ChangeObserver, EventSink, NullWatch, PollingLoop, WatchCapability,
};

#[derive(Default)]
struct FakeState {
    dirs: BTreeSet<String>,
    sink: Option<EventSink>,
    fail_on: Option<String>,
}

/// Records subscriptions and lets the test fire notifications.
#[derive(Clone, Default)]
struct FakeWatch(Arc<Mutex<FakeState>>);

impl FakeWatch {
    fn failing_on(dir: &str) -> Self {
        let fake = Self::default();
        fake.0.lock().unwrap().fail_on = Some(dir.to_string());
        fake
    }

    fn fire(&self) {
        let sink = self.0.lock().unwrap().sink.clone();
        if let Some(sink) = sink {
            sink.notify();
        }
    }

    fn dirs(&self) -> BTreeSet<String> {
        self.0.lock().unwrap().dirs.clone()
    }
}

impl WatchCapability for FakeWatch {
    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&mut self, dir: &str, sink: &EventSink) -> Result<()> {
        let mut state = self.0.lock().unwrap();
        if state.fail_on.as_deref() == Some(dir) {
            anyhow::bail!("refused: {dir}");
        }
        state.dirs.insert(dir.to_string());
        state.sink = Some(sink.clone());
        Ok(())
    }

    fn unsubscribe(&mut self, dir: &str) -> Result<()> {
        self.0.lock().unwrap().dirs.remove(dir);
        Ok(())
    }

    fn unsubscribe_all(&mut self) {
        let mut state = self.0.lock().unwrap();
        state.dirs.clear();
        state.sink = None;
    }
}

fn counter() -> (ChangeCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let callback: ChangeCallback = Arc::new(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (callback, count)
}

fn project() -> Arc<MemoryFs> {
    let fs = MemoryFs::new();
    fs.insert_file("README.md", "# readme").unwrap();
    fs.insert_file("src/lib.rs", "pub fn f() {}").unwrap();
    fs.insert_file("src/bin/tool.rs", "fn main() {}").unwrap();
    Arc::new(fs)
}

fn wait_for(count: &AtomicUsize, at_least: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= at_least {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_unavailable_notification_means_polling() {
    let fs = project();
    let workspace = Workspace::new(fs, Box::new(NullWatch), &Config::default());
    let (callback, count) = counter();

    assert!(!workspace.start_monitoring(callback));
    assert!(!workspace.is_monitoring());

    workspace.stop_monitoring();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_every_directory_subscribed() {
    let fs = project();
    let fake = FakeWatch::default();
    let workspace = Workspace::new(fs, Box::new(fake.clone()), &Config::default());
    let (callback, count) = counter();

    assert!(workspace.start_monitoring(callback));

    let expected: BTreeSet<String> = ["", "src", "src/bin"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    assert_eq!(fake.dirs(), expected);

    fake.fire();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    workspace.stop_monitoring();
    assert!(fake.dirs().is_empty());
    fake.fire();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_backup_is_not_reported_as_a_change() -> Result<()> {
    let fs = project();
    let fake = FakeWatch::default();
    let workspace = Workspace::new(fs, Box::new(fake.clone()), &Config::default());
    let (callback, count) = counter();
    assert!(workspace.start_monitoring(callback.clone()));

    // Notifications raised by the backup's own writes
    workspace.create_backup("quiet", &mut |_: u8| fake.fire())?;
    assert_eq!(count.load(Ordering::SeqCst), 0);

    // The version folder appeared but is never watched
    assert!(workspace.start_monitoring(callback));
    assert!(fake.dirs().iter().all(|d| !d.starts_with(treelens::METADATA_DIR)));

    fake.fire();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_restart_tracks_new_and_removed_directories() -> Result<()> {
    let fs = project();
    let fake = FakeWatch::default();
    let workspace = Workspace::new(fs.clone(), Box::new(fake.clone()), &Config::default());
    let (callback, _count) = counter();
    assert!(workspace.start_monitoring(callback.clone()));

    fs.insert_file("docs/guide.md", "# guide")?;
    fs.remove("src/bin")?;
    assert!(workspace.start_monitoring(callback));

    let expected: BTreeSet<String> = ["", "docs", "src"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    assert_eq!(fake.dirs(), expected);
    Ok(())
}

#[test]
fn test_partial_subscription_failure_tears_down() {
    let fs = project();
    let fake = FakeWatch::failing_on("src/bin");
    let mut observer = ChangeObserver::new(fake.clone());
    let (callback, count) = counter();

    assert!(!observer.start_monitoring(fs.as_ref(), callback));
    assert!(!observer.is_monitoring());
    assert!(fake.dirs().is_empty());

    fake.fire();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_polling_ticks_and_pauses_with_workspace() {
    let fs = project();
    let workspace = Workspace::new(fs, Box::new(NullWatch), &Config::default());
    let (callback, count) = counter();

    let poller = workspace
        .start_polling(Duration::from_millis(10), callback)
        .unwrap();
    assert!(wait_for(&count, 2));

    let guard = workspace.pause();
    // Let a tick that raced the guard land
    thread::sleep(Duration::from_millis(50));
    let frozen = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(count.load(Ordering::SeqCst), frozen);

    drop(guard);
    assert!(wait_for(&count, frozen + 1));
    poller.stop();
}

#[test]
fn test_polling_rejects_zero_interval() {
    let (callback, _count) = counter();
    assert!(PollingLoop::start(Duration::ZERO, callback).is_err());
}
