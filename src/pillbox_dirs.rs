//! Centralized application directory paths for pillbox.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/pillbox/` | `~/.local/share/pillbox/` |
//! | Config | `~/Library/Application Support/pillbox/` | `~/.config/pillbox/` |
//!
//! # Environment Overrides
//!
//! - `PILLBOX_DATA_DIR` overrides [`data_dir`]
//! - `PILLBOX_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the persisted reminder collection. Resolves to
/// `dirs::data_dir()/pillbox/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("PILLBOX_DATA_DIR"),
        dirs::data_dir(),
        "/tmp/pillbox-data",
    )
}

/// Application config directory (`config.toml`).
///
/// Resolves to `dirs::config_dir()/pillbox/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("PILLBOX_CONFIG_DIR"),
        dirs::config_dir(),
        "/tmp/pillbox-config",
    )
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Reminder collection file path (`data_dir()/reminders.json`).
///
/// Kept apart from every other piece of application state.
#[must_use]
pub fn reminders_file() -> PathBuf {
    data_dir().join("reminders.json")
}

fn resolve(override_dir: Option<OsString>, platform: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(dir) = override_dir {
        return PathBuf::from(dir);
    }
    platform
        .map(|d| d.join("pillbox"))
        .unwrap_or_else(|| PathBuf::from(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_pillbox() {
        let dir = data_dir();
        assert!(!dir.as_os_str().is_empty());
        if std::env::var_os("PILLBOX_DATA_DIR").is_none() {
            let s = dir.to_string_lossy();
            assert!(s.contains("pillbox"), "data_dir should contain 'pillbox': {s}");
        }
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }

    #[test]
    fn reminders_file_is_subpath_of_data_dir() {
        let file = reminders_file();
        assert!(
            file.starts_with(data_dir()),
            "reminders_file ({}) should start with data_dir",
            file.display()
        );
        assert!(file.to_string_lossy().ends_with("reminders.json"));
    }

    #[test]
    fn override_wins_over_platform_dir() {
        let result = resolve(
            Some(OsString::from("/custom/data")),
            Some(PathBuf::from("/home/u/.local/share")),
            "/tmp/x",
        );
        assert_eq!(result, PathBuf::from("/custom/data"));
    }

    #[test]
    fn platform_dir_gets_app_suffix() {
        let result = resolve(None, Some(PathBuf::from("/home/u/.config")), "/tmp/x");
        assert_eq!(result, PathBuf::from("/home/u/.config/pillbox"));
    }

    #[test]
    fn fallback_used_without_platform_dir() {
        let result = resolve(None, None, "/tmp/pillbox-data");
        assert_eq!(result, PathBuf::from("/tmp/pillbox-data"));
    }
}
