//! Reminder scheduling engine.
//!
//! [`SchedulingEngine`] ties the store, trigger computation, timer registry
//! and notifier together. Every mutation is written to the store before the
//! matching timer change, so a read straight after a mutation always sees it.

use crate::config::PillboxConfig;
use crate::error::Result;
use crate::notify::Notifier;
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::reminder::{DayFilter, MedicineDirectory, Reminder, ReminderInput, TimeOfDay};
use crate::scheduler::store::{FileReminderStore, ReminderStore};
use crate::scheduler::timers::{FireHandler, TimerRegistry};
use crate::scheduler::trigger::TriggerCalculator;
use chrono::{DateTime, Datelike, FixedOffset, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Next fire of one enabled reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingDose {
    /// Reminder the dose belongs to.
    pub reminder_id: String,
    /// Medicine the reminder belongs to.
    pub medicine_id: u64,
    /// Local time of day of the reminder.
    pub time: TimeOfDay,
    /// Next fire instant, in the clock's local offset.
    pub fires_at: DateTime<FixedOffset>,
    /// Delay from now until `fires_at`.
    pub delay: Duration,
}

/// Orchestrates persistence, timers and notification delivery.
pub struct SchedulingEngine<C: Clock = SystemClock> {
    store: Box<dyn ReminderStore>,
    timers: TimerRegistry,
    notifier: Arc<Notifier>,
    clock: Arc<C>,
    trigger: TriggerCalculator,
    medicines: MedicineDirectory,
    title: String,
}

impl SchedulingEngine<SystemClock> {
    /// Engine on the configured reminder file, the platform notifier and the
    /// system clock.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn from_config(config: &PillboxConfig) -> Result<Self> {
        let store = FileReminderStore::new(config.storage.reminders_path());
        let notifier = Notifier::from_config(&config.notifications);
        Self::new(
            config,
            Box::new(store),
            Arc::new(notifier),
            Arc::new(SystemClock),
        )
    }
}

impl<C: Clock> SchedulingEngine<C> {
    /// Create an engine. Nothing is armed until [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(
        config: &PillboxConfig,
        store: Box<dyn ReminderStore>,
        notifier: Arc<Notifier>,
        clock: Arc<C>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            timers: TimerRegistry::new(config.scheduler.repeat_period())?,
            notifier,
            clock,
            trigger: TriggerCalculator::from_config(&config.scheduler),
            medicines: MedicineDirectory::new(),
            title: config.notifications.title.clone(),
        })
    }

    /// Ask for notification permission if undecided, then arm every enabled
    /// reminder. Returns the number armed.
    pub fn init(&mut self, medicines: Option<MedicineDirectory>) -> usize {
        match self.notifier.ensure_permission() {
            Some(permission) => debug!("notification permission: {permission:?}"),
            None => debug!("no rich notification capability, alerts only"),
        }
        self.reschedule_all(medicines)
    }

    /// Cancel every timer, reload the collection and arm each enabled
    /// reminder. `medicines`, when given, replaces the remembered directory.
    pub fn reschedule_all(&mut self, medicines: Option<MedicineDirectory>) -> usize {
        if let Some(medicines) = medicines {
            self.medicines = medicines;
        }

        let cancelled = self.timers.cancel_all();
        let reminders = self.store.load_all();
        let mut armed = 0;
        for reminder in reminders.iter().filter(|r| r.enabled) {
            self.schedule(reminder);
            armed += 1;
        }
        info!(
            "armed {armed} of {} reminders ({cancelled} timers replaced)",
            reminders.len()
        );
        armed
    }

    /// Every persisted reminder, in stored order.
    #[must_use]
    pub fn list_all(&self) -> Vec<Reminder> {
        self.store.load_all()
    }

    /// Persisted reminders for one medicine.
    #[must_use]
    pub fn list_by_medicine(&self, medicine_id: u64) -> Vec<Reminder> {
        self.store
            .load_all()
            .into_iter()
            .filter(|r| r.medicine_id == medicine_id)
            .collect()
    }

    /// Create, persist and (when enabled) arm a reminder.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::InvalidReminder`] for bad input and
    /// [`crate::ReminderError::Store`] when the collection cannot be saved.
    /// Nothing is armed on error.
    pub fn add(&mut self, input: ReminderInput) -> Result<Reminder> {
        let reminder = input.into_reminder(self.now_utc())?;

        let mut reminders = self.store.load_all();
        reminders.push(reminder.clone());
        self.store.save_all(&reminders)?;

        info!(
            "added reminder {} for medicine {} at {}",
            reminder.id, reminder.medicine_id, reminder.time
        );
        if reminder.enabled {
            self.schedule(&reminder);
        }
        Ok(reminder)
    }

    /// Delete a reminder and cancel its timer.
    ///
    /// Returns `false` when no reminder had that id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::Store`] when the collection cannot be saved.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let mut reminders = self.store.load_all();
        let before = reminders.len();
        reminders.retain(|r| r.id != id);
        let removed = reminders.len() != before;

        if removed {
            self.store.save_all(&reminders)?;
            info!("removed reminder {id}");
        } else {
            debug!("remove: no reminder {id}");
        }
        self.timers.cancel(id);
        Ok(removed)
    }

    /// Toggle a reminder. Enabling re-arms with a fresh delay, disabling
    /// cancels.
    ///
    /// Returns `false` and changes nothing when no reminder had that id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ReminderError::Store`] when the collection cannot be saved.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool> {
        let now = self.now_utc();
        let mut reminders = self.store.load_all();
        let Some(reminder) = reminders.iter_mut().find(|r| r.id == id) else {
            debug!("set_enabled: no reminder {id}");
            return Ok(false);
        };
        reminder.set_enabled(enabled, now);
        let updated = reminder.clone();
        self.store.save_all(&reminders)?;

        if enabled {
            self.schedule(&updated);
            info!("enabled reminder {id}");
        } else {
            self.timers.cancel(id);
            info!("disabled reminder {id}");
        }
        Ok(true)
    }

    /// Next fire of every enabled reminder, soonest first.
    #[must_use]
    pub fn upcoming(&self) -> Vec<UpcomingDose> {
        let now = self.clock.now();
        let mut doses: Vec<UpcomingDose> = self
            .store
            .load_all()
            .into_iter()
            .filter(|r| r.enabled)
            .map(|r| {
                let delay = self.trigger.compute_delay(&now, r.time, r.day_filter());
                let fires_at = self
                    .trigger
                    .next_fire_at(&now, r.time, r.day_filter())
                    .fixed_offset();
                UpcomingDose {
                    reminder_id: r.id,
                    medicine_id: r.medicine_id,
                    time: r.time,
                    fires_at,
                    delay,
                }
            })
            .collect();
        doses.sort_by(|a, b| {
            a.fires_at
                .cmp(&b.fires_at)
                .then_with(|| a.reminder_id.cmp(&b.reminder_id))
        });
        doses
    }

    /// Live timers.
    #[must_use]
    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Medicine names used for notification bodies.
    #[must_use]
    pub fn medicines(&self) -> &MedicineDirectory {
        &self.medicines
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn schedule(&mut self, reminder: &Reminder) {
        let filter = reminder.day_filter();
        let delay = self
            .trigger
            .compute_delay(&self.clock.now(), reminder.time, filter);
        let handler = self.fire_handler(reminder, filter);
        self.timers.arm(&reminder.id, delay, handler);
    }

    fn fire_handler(&self, reminder: &Reminder, filter: DayFilter) -> FireHandler {
        let clock = Arc::clone(&self.clock);
        let notifier = Arc::clone(&self.notifier);
        let title = self.title.clone();
        let body = reminder.notification_body(&self.medicines);
        let id = reminder.id.clone();

        Arc::new(move |kind| {
            let weekday = clock.now().weekday();
            if !filter.admits(weekday) {
                debug!("reminder {id} not due on {weekday} ({kind:?})");
                return;
            }
            let delivery = notifier.notify(&title, &body);
            info!("reminder {id} delivered ({kind:?}, {delivery:?})");
        })
    }
}

impl<C: Clock> std::fmt::Debug for SchedulingEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingEngine")
            .field("timers", &self.timers)
            .field("medicines", &self.medicines.len())
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}
