//! Reminder scheduling.
//!
//! Persists reminder definitions, computes each reminder's next fire time
//! from the local clock and its weekday filter, keeps exactly one live timer
//! per enabled reminder and hands fired reminders to the notifier.
//!
//! [`SchedulingEngine`] is the entry point; the other modules are its parts.

pub mod clock;
pub mod engine;
pub mod reminder;
pub mod store;
pub mod timers;
pub mod trigger;
pub mod watch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{SchedulingEngine, UpcomingDose};
pub use reminder::{DayFilter, MedicineDirectory, Reminder, ReminderInput, TimeOfDay};
pub use store::{FileReminderStore, MemoryReminderStore, ReminderStore};
pub use timers::{FireKind, TimerPhase, TimerRegistry};
pub use trigger::TriggerCalculator;
pub use watch::StoreWatcher;
