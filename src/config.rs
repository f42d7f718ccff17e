//! Configuration types for the reminder engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Seconds in one day; default repeat cadence and scan fallback.
const DAY_SECS: u64 = 24 * 3600;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PillboxConfig {
    /// Timer and trigger computation settings.
    pub scheduler: SchedulerConfig,
    /// Notification delivery settings.
    pub notifications: NotificationConfig,
    /// Persistence settings.
    pub storage: StorageConfig,
}

/// Scheduling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period of the repeating timer installed after the first fire.
    pub repeat_period_secs: u64,
    /// Delay used when the day scan finds no qualifying day.
    pub fallback_delay_secs: u64,
    /// Number of days scanned past today (inclusive upper bound).
    ///
    /// Must be at least 7 so "same weekday next week" stays reachable.
    pub max_scan_days: u32,
    /// How often `pillbox run` checks the reminder file for outside edits.
    /// Zero disables the check.
    pub reload_poll_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            repeat_period_secs: DAY_SECS,
            fallback_delay_secs: DAY_SECS,
            max_scan_days: 7,
            reload_poll_secs: 5,
        }
    }
}

impl SchedulerConfig {
    /// Repeat cadence as a [`Duration`], never shorter than one second.
    #[must_use]
    pub fn repeat_period(&self) -> Duration {
        Duration::from_secs(self.repeat_period_secs.max(1))
    }

    /// Fallback delay as a [`Duration`], never shorter than one second.
    #[must_use]
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_secs(self.fallback_delay_secs.max(1))
    }

    /// Scan horizon in days, clamped to at least one week.
    #[must_use]
    pub fn scan_days(&self) -> u32 {
        self.max_scan_days.max(7)
    }

    /// Store polling interval, or `None` when polling is off.
    #[must_use]
    pub fn reload_poll(&self) -> Option<Duration> {
        (self.reload_poll_secs > 0).then(|| Duration::from_secs(self.reload_poll_secs))
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Title shown on every reminder notification.
    pub title: String,
    /// Try rich desktop notifications before the console alert.
    pub desktop: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "Medication Reminder".to_owned(),
            desktop: true,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Reminder collection file. `None` uses [`crate::pillbox_dirs::reminders_file`].
    pub reminders_file: Option<PathBuf>,
}

impl StorageConfig {
    /// Effective path of the reminder collection file.
    #[must_use]
    pub fn reminders_path(&self) -> PathBuf {
        self.reminders_file
            .clone()
            .unwrap_or_else(crate::pillbox_dirs::reminders_file)
    }
}

impl PillboxConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ReminderError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReminderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> PathBuf {
        crate::pillbox_dirs::config_file()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PillboxConfig::default();
        assert_eq!(config.scheduler.repeat_period(), Duration::from_secs(86_400));
        assert_eq!(config.scheduler.fallback_delay(), Duration::from_secs(86_400));
        assert_eq!(config.scheduler.scan_days(), 7);
        assert_eq!(config.scheduler.reload_poll(), Some(Duration::from_secs(5)));
        assert_eq!(config.notifications.title, "Medication Reminder");
        assert!(config.notifications.desktop);
        assert!(config.storage.reminders_file.is_none());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: PillboxConfig = toml::from_str("").unwrap();
        assert_eq!(config.scheduler.repeat_period_secs, 86_400);
        assert_eq!(config.notifications.title, "Medication Reminder");
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml_str = r#"
[notifications]
desktop = false
"#;
        let config: PillboxConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.notifications.desktop);
        assert_eq!(config.notifications.title, "Medication Reminder");
        assert_eq!(config.scheduler.max_scan_days, 7);
    }

    #[test]
    fn scan_days_never_below_one_week() {
        let config = SchedulerConfig {
            max_scan_days: 3,
            ..Default::default()
        };
        assert_eq!(config.scan_days(), 7);
    }

    #[test]
    fn zero_periods_are_clamped() {
        let config = SchedulerConfig {
            repeat_period_secs: 0,
            fallback_delay_secs: 0,
            max_scan_days: 7,
            reload_poll_secs: 0,
        };
        assert_eq!(config.repeat_period(), Duration::from_secs(1));
        assert_eq!(config.fallback_delay(), Duration::from_secs(1));
        assert_eq!(config.reload_poll(), None);
    }

    #[test]
    fn storage_override_is_used() {
        let storage = StorageConfig {
            reminders_file: Some(PathBuf::from("/srv/pillbox/r.json")),
        };
        assert_eq!(storage.reminders_path(), PathBuf::from("/srv/pillbox/r.json"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = PillboxConfig::default();
        config.notifications.title = "Pills".to_owned();
        config.scheduler.repeat_period_secs = 3600;
        config.save_to_file(&path).unwrap();

        let loaded = PillboxConfig::from_file(&path).unwrap();
        assert_eq!(loaded.notifications.title, "Pills");
        assert_eq!(loaded.scheduler.repeat_period_secs, 3600);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PillboxConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.scheduler.max_scan_days, 7);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "scheduler = 12").unwrap();
        let err = PillboxConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, crate::error::ReminderError::Config(_)));
    }
}
