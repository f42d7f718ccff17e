//! Reminder definitions and the value types they are built from.
//!
//! Defines the persisted [`Reminder`] record, the [`ReminderInput`] supplied by
//! callers, the [`TimeOfDay`] and [`DayFilter`] scheduling types, and the
//! [`MedicineDirectory`] used to build notification text.

use crate::error::{ReminderError, Result};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Body used when a reminder has no label and its medicine is unknown.
pub const GENERIC_BODY: &str = "Time to take your medicine";

/// Wall-clock time of day (local to the device), minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a time of day, validating the ranges.
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            return Err(ReminderError::InvalidReminder(format!(
                "hour must be 0-23, got {hour}"
            )));
        }
        if minute > 59 {
            return Err(ReminderError::InvalidReminder(format!(
                "minute must be 0-59, got {minute}"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Hour of day (0-23).
    #[must_use]
    pub fn hour(self) -> u8 {
        self.hour
    }

    /// Minute of hour (0-59).
    #[must_use]
    pub fn minute(self) -> u8 {
        self.minute
    }

    pub(crate) fn as_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ReminderError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ReminderError::InvalidReminder(format!("time must be HH:mm, got '{s}'"));
        let (hh, mm) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hh.is_empty() || hh.len() > 2 || mm.len() != 2 || !digits(hh) || !digits(mm) {
            return Err(invalid());
        }
        let hour = hh.parse::<u8>().map_err(|_| invalid())?;
        let minute = mm.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ReminderError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Which weekdays a reminder may fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    /// No restriction.
    Every,
    /// Bit `n` set admits weekday `n` (0 = Sunday .. 6 = Saturday).
    Only(u8),
}

impl DayFilter {
    /// Build a filter from persisted weekday indices.
    ///
    /// Absent or empty means every day. Indices outside 0-6 never match, so a
    /// list made only of bad indices admits nothing.
    #[must_use]
    pub fn from_indices(days: Option<&[u8]>) -> Self {
        match days {
            None | Some([]) => Self::Every,
            Some(days) => Self::Only(
                days.iter()
                    .filter(|d| **d <= 6)
                    .fold(0u8, |mask, d| mask | (1u8 << *d)),
            ),
        }
    }

    /// Returns `true` when reminders may fire on `weekday`.
    #[must_use]
    pub fn admits(self, weekday: Weekday) -> bool {
        match self {
            Self::Every => true,
            Self::Only(mask) => mask & (1u8 << weekday.num_days_from_sunday()) != 0,
        }
    }
}

/// A persisted reminder: one medicine dose-time rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Unique identifier (UUID v4), immutable.
    pub id: String,
    /// Externally owned medicine this reminder belongs to.
    pub medicine_id: u64,
    /// Local time of day to fire.
    pub time: TimeOfDay,
    /// Optional notification body override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Weekday indices (0 = Sunday); absent or empty means every day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    /// Disabled reminders stay persisted but are never armed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl Reminder {
    /// Weekday filter derived from `days_of_week`.
    #[must_use]
    pub fn day_filter(&self) -> DayFilter {
        DayFilter::from_indices(self.days_of_week.as_deref())
    }

    /// Notification body: the label, else the medicine name, else a generic line.
    #[must_use]
    pub fn notification_body(&self, medicines: &MedicineDirectory) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match medicines.name(self.medicine_id) {
            Some(name) => format!("Time to take {name}"),
            None => GENERIC_BODY.to_owned(),
        }
    }

    /// Update `enabled` and stamp `updated_at`.
    pub fn set_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        self.enabled = enabled;
        self.updated_at = now;
    }
}

/// Caller-supplied fields for a new reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderInput {
    /// Medicine the reminder belongs to.
    pub medicine_id: u64,
    /// Local time of day to fire.
    pub time: TimeOfDay,
    /// Optional notification body override.
    #[serde(default)]
    pub label: Option<String>,
    /// Weekday indices (0 = Sunday); absent or empty means every day.
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    /// Defaults to `true`.
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl ReminderInput {
    /// An enabled, every-day reminder input.
    #[must_use]
    pub fn new(medicine_id: u64, time: TimeOfDay) -> Self {
        Self {
            medicine_id,
            time,
            label: None,
            days_of_week: None,
            enabled: None,
        }
    }

    /// Set the notification body override.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Restrict firing to the given weekday indices.
    #[must_use]
    pub fn with_days(mut self, days: impl Into<Vec<u8>>) -> Self {
        self.days_of_week = Some(days.into());
        self
    }

    /// Set the initial enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Validate the input and build a reminder with a fresh id and timestamps.
    pub fn into_reminder(self, now: DateTime<Utc>) -> Result<Reminder> {
        if let Some(bad) = self
            .days_of_week
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|d| **d > 6)
        {
            return Err(ReminderError::InvalidReminder(format!(
                "day of week must be 0-6, got {bad}"
            )));
        }

        let label = self
            .label
            .filter(|label| !label.trim().is_empty());

        Ok(Reminder {
            id: uuid::Uuid::new_v4().to_string(),
            medicine_id: self.medicine_id,
            time: self.time,
            label,
            days_of_week: self.days_of_week,
            enabled: self.enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Medicine id to display name lookup, supplied by the host application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicineDirectory {
    names: HashMap<u64, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MedicineEntry {
    id: u64,
    medicine_name: String,
}

impl MedicineDirectory {
    /// An empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a medicine name.
    pub fn insert(&mut self, id: u64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Display name for `id`, if known.
    #[must_use]
    pub fn name(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of known medicines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no medicines are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parse the host's medicine list: a JSON array of objects with `id` and
    /// `medicineName` (other fields ignored).
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<MedicineEntry> = serde_json::from_str(json)
            .map_err(|e| ReminderError::InvalidReminder(format!("cannot parse medicines: {e}")))?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.id, entry.medicine_name))
            .collect())
    }
}

impl FromIterator<(u64, String)> for MedicineDirectory {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
