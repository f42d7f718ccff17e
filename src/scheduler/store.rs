//! Durable reminder persistence.
//!
//! The collection is stored as one JSON array of [`Reminder`] records in its
//! own file. Reads never fail: a missing file is an empty collection, and an
//! unreadable or malformed payload is logged and treated as empty. Records
//! that fail to parse individually are skipped.

use crate::error::{ReminderError, Result};
use crate::scheduler::reminder::Reminder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Persistence backend for the reminder collection.
///
/// Implementations read and write the whole collection at once; callers do
/// read-modify-write on the full list.
pub trait ReminderStore: Send + Sync {
    /// Load every persisted reminder, in stored order.
    fn load_all(&self) -> Vec<Reminder>;

    /// Replace the persisted collection.
    fn save_all(&self, reminders: &[Reminder]) -> Result<()>;
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileReminderStore {
    path: PathBuf,
}

impl FileReminderStore {
    /// Create a store bound to `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location ([`crate::pillbox_dirs::reminders_file`]).
    #[must_use]
    pub fn at_default_path() -> Self {
        Self::new(crate::pillbox_dirs::reminders_file())
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReminderStore for FileReminderStore {
    fn load_all(&self) -> Vec<Reminder> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("cannot read reminders at {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        let reminders = parse_collection(&bytes);
        debug!(
            "loaded {} reminders from {}",
            reminders.len(),
            self.path.display()
        );
        reminders
    }

    fn save_all(&self, reminders: &[Reminder]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReminderError::Store(format!("cannot create reminder directory: {e}"))
            })?;
        }

        let json = serde_json::to_vec_pretty(reminders)
            .map_err(|e| ReminderError::Store(format!("cannot serialize reminders: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| ReminderError::Store(format!("cannot write reminders temp file: {e}")))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| ReminderError::Store(format!("cannot finalize reminders file: {e}")))?;
        Ok(())
    }
}

/// In-memory store for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryReminderStore {
    reminders: Mutex<Vec<Reminder>>,
}

impl MemoryReminderStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `reminders`.
    #[must_use]
    pub fn with_reminders(reminders: Vec<Reminder>) -> Self {
        Self {
            reminders: Mutex::new(reminders),
        }
    }
}

impl ReminderStore for MemoryReminderStore {
    fn load_all(&self) -> Vec<Reminder> {
        self.reminders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save_all(&self, reminders: &[Reminder]) -> Result<()> {
        *self.reminders.lock().unwrap_or_else(PoisonError::into_inner) = reminders.to_vec();
        Ok(())
    }
}

/// Decode a stored payload, tolerating corruption.
fn parse_collection(bytes: &[u8]) -> Vec<Reminder> {
    let values: Vec<serde_json::Value> = match serde_json::from_slice(bytes) {
        Ok(values) => values,
        Err(e) => {
            warn!("ignoring malformed reminder store: {e}");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut reminders = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<Reminder>(value) {
            Ok(reminder) if seen.insert(reminder.id.clone()) => reminders.push(reminder),
            Ok(reminder) => warn!("dropping duplicate reminder id '{}'", reminder.id),
            Err(e) => warn!("skipping malformed reminder #{index}: {e}"),
        }
    }
    reminders
}
