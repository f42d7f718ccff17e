//! Integration tests: scheduling engine on a real reminder file.

use chrono::DateTime;
use pillbox::notify::AlertSink;
use pillbox::scheduler::{FileReminderStore, ManualClock, ReminderStore, StoreWatcher};
use pillbox::{Notifier, PillboxConfig, ReminderInput, SchedulingEngine, TimeOfDay};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorded(Mutex<Vec<String>>);

struct RecordingAlert(Arc<Recorded>);

impl AlertSink for RecordingAlert {
    fn alert(&self, message: &str) {
        self.0.0.lock().expect("alert lock").push(message.to_owned());
    }
}

fn engine_on(path: &Path, now: &str) -> (SchedulingEngine<ManualClock>, Arc<Recorded>) {
    let alerts = Arc::new(Recorded::default());
    let notifier = Notifier::new(None, Box::new(RecordingAlert(Arc::clone(&alerts))));
    let clock = ManualClock::new(DateTime::parse_from_rfc3339(now).expect("timestamp"));
    let engine = SchedulingEngine::new(
        &PillboxConfig::default(),
        Box::new(FileReminderStore::new(path)),
        Arc::new(notifier),
        Arc::new(clock),
    )
    .expect("engine");
    (engine, alerts)
}

/// Handlers run on the blocking pool; poll until `n` of them completed.
async fn wait_for_fires(engine: &SchedulingEngine<ManualClock>, id: &str, n: u64) {
    for _ in 0..5_000 {
        if engine.timers().fires(id).unwrap_or(0) >= n {
            return;
        }
        tokio::task::yield_now().await;
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("reminder {id} did not reach {n} fires");
}

fn at(hour: u8, minute: u8) -> TimeOfDay {
    TimeOfDay::new(hour, minute).expect("time")
}

#[tokio::test]
async fn mutations_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reminders.json");

    let (mut first, _) = engine_on(&path, "2024-06-02T09:00:00+00:00");
    let kept = first
        .add(ReminderInput::new(7, at(8, 0)).with_days(vec![1, 3, 5]))
        .expect("add");
    let paused = first.add(ReminderInput::new(7, at(20, 0))).expect("add");
    let gone = first.add(ReminderInput::new(9, at(12, 0))).expect("add");
    assert!(first.set_enabled(&paused.id, false).expect("disable"));
    assert!(first.remove(&gone.id).expect("remove"));
    drop(first);

    let (mut second, _) = engine_on(&path, "2024-06-02T09:00:00+00:00");
    assert_eq!(second.init(None), 1);
    assert!(second.timers().is_armed(&kept.id));
    assert!(!second.timers().is_armed(&paused.id));

    let listed = second.list_by_medicine(7);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0], kept);
    assert!(!listed[1].enabled);
    assert!(second.list_by_medicine(9).is_empty());
}

#[tokio::test]
async fn corrupt_file_reads_empty_and_is_overwritten_by_add() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reminders.json");
    std::fs::write(&path, "not json at all").expect("write");

    let (mut engine, _) = engine_on(&path, "2024-06-02T09:00:00+00:00");
    assert!(engine.list_all().is_empty());
    assert_eq!(engine.init(None), 0);

    let reminder = engine.add(ReminderInput::new(1, at(8, 0))).expect("add");
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("valid json");
    assert_eq!(raw.as_array().map(Vec::len), Some(1));
    assert_eq!(raw[0]["id"], reminder.id.as_str());
}

#[tokio::test]
async fn outside_edit_is_picked_up_by_rescan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reminders.json");

    let (mut host, _) = engine_on(&path, "2024-06-02T09:00:00+00:00");
    host.init(None);
    let mut watcher = StoreWatcher::new(&path);

    // Another process adds a reminder to the same file.
    let other = FileReminderStore::new(&path);
    let added = ReminderInput::new(3, at(18, 30))
        .into_reminder(chrono::Utc::now())
        .expect("reminder");
    other.save_all(std::slice::from_ref(&added)).expect("save");

    assert!(watcher.changed());
    assert_eq!(host.reschedule_all(None), 1);
    assert!(host.timers().is_armed(&added.id));
}

#[tokio::test(start_paused = true)]
async fn fired_reminder_uses_label_and_keeps_repeating() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reminders.json");
    let (mut engine, alerts) = engine_on(&path, "2024-06-02T07:59:00+00:00");

    engine.init(None);
    let reminder = engine
        .add(ReminderInput::new(4, at(8, 0)).with_label("Take with water"))
        .expect("add");

    tokio::time::advance(Duration::from_secs(60)).await;
    wait_for_fires(&engine, &reminder.id, 1).await;
    tokio::time::advance(Duration::from_secs(24 * 3600)).await;
    wait_for_fires(&engine, &reminder.id, 2).await;

    let seen = alerts.0.lock().expect("alert lock").clone();
    assert_eq!(
        seen,
        vec![
            "Medication Reminder: Take with water".to_owned(),
            "Medication Reminder: Take with water".to_owned()
        ]
    );
}
