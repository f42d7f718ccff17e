//! Integration tests: configuration file handling.

use pillbox::PillboxConfig;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn full_config_roundtrips_via_toml() {
    let mut config = PillboxConfig::default();
    config.scheduler.repeat_period_secs = 12 * 3600;
    config.scheduler.reload_poll_secs = 0;
    config.notifications.title = "Pills".to_owned();
    config.notifications.desktop = false;
    config.storage.reminders_file = Some(PathBuf::from("/var/lib/pillbox/reminders.json"));

    let toml_str = toml::to_string(&config).expect("serialize to TOML");
    let restored: PillboxConfig = toml::from_str(&toml_str).expect("deserialize from TOML");

    assert_eq!(restored.scheduler.repeat_period(), Duration::from_secs(12 * 3600));
    assert_eq!(restored.scheduler.reload_poll(), None);
    assert_eq!(restored.notifications.title, "Pills");
    assert!(!restored.notifications.desktop);
    assert_eq!(
        restored.storage.reminders_path(),
        PathBuf::from("/var/lib/pillbox/reminders.json")
    );
}

#[test]
fn hand_written_file_loads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[scheduler]
max_scan_days = 14

[notifications]
title = "Medicine time"
"#,
    )
    .expect("write");

    let config = PillboxConfig::load_or_default(&path).expect("load");
    assert_eq!(config.scheduler.scan_days(), 14);
    assert_eq!(config.scheduler.fallback_delay(), Duration::from_secs(86_400));
    assert_eq!(config.notifications.title, "Medicine time");
    assert!(config.notifications.desktop);
}
