//! Detects edits to the reminder file made by other processes.
//!
//! A long-running host arms timers once at startup; when a separate
//! `pillbox add` writes the shared file, the host has to rescan. The watcher
//! polls the file's metadata and sends one message per observed change.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What a file looked like at the last poll. `None` means it did not exist.
type Fingerprint = Option<(SystemTime, u64)>;

/// Polls a store file for outside modifications.
#[derive(Debug)]
pub struct StoreWatcher {
    path: PathBuf,
    last: Fingerprint,
}

impl StoreWatcher {
    /// Start watching `path`; its current state is the baseline.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = fingerprint(&path);
        Self { path, last }
    }

    /// Watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when the file changed since the previous call
    /// (or since construction), including creation and deletion.
    pub fn changed(&mut self) -> bool {
        let current = fingerprint(&self.path);
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }

    /// Poll every `interval` until `cancel` fires, sending `()` on each change.
    ///
    /// Stops early when the receiver is gone.
    pub async fn run(mut self, interval: Duration, tx: mpsc::Sender<()>, cancel: CancellationToken) {
        info!("watching {} for changes", self.path.display());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("store watcher stopped");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if self.changed() {
                        debug!("{} changed on disk", self.path.display());
                        if tx.send(()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = std::fs::metadata(path).ok()?;
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    Some((modified, meta.len()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn unchanged_file_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, b"[]").unwrap();

        let mut watcher = StoreWatcher::new(&path);
        assert!(!watcher.changed());
        assert!(!watcher.changed());
    }

    #[test]
    fn creation_and_deletion_are_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let mut watcher = StoreWatcher::new(&path);
        assert!(!watcher.changed());

        std::fs::write(&path, b"[]").unwrap();
        assert!(watcher.changed());
        assert!(!watcher.changed());

        std::fs::remove_file(&path).unwrap();
        assert!(watcher.changed());
    }

    #[test]
    fn rewrite_with_new_length_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        std::fs::write(&path, b"[]").unwrap();
        let mut watcher = StoreWatcher::new(&path);

        std::fs::write(&path, b"[ ]").unwrap();
        assert!(watcher.changed());
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = StoreWatcher::new(dir.path().join("reminders.json"));
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(Duration::from_millis(10), tx, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_reports_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.json");
        let watcher = StoreWatcher::new(&path);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        tokio::spawn(watcher.run(Duration::from_millis(10), tx, cancel.clone()));

        std::fs::write(&path, b"[]").unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no change reported")
            .expect("watcher closed");
        cancel.cancel();
    }
}
