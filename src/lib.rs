//! Pillbox: local medicine reminder scheduling.
//!
//! Reminders are stored as JSON on the device, armed as tokio timers and
//! delivered as desktop notifications (or console alerts when those are not
//! available).
//!
//! # Architecture
//!
//! - **Store**: the reminder collection on disk, the single source of truth
//! - **Trigger**: next qualifying local time for a time of day and weekday filter
//! - **Timers**: one fire path per enabled reminder, repeating every 24 hours
//! - **Notify**: rich notification with permission handling, alert fallback
//! - **Engine**: applies mutations to the store, then re-arms timers

pub mod config;
pub mod error;
pub mod notify;
pub mod pillbox_dirs;
pub mod scheduler;

pub use config::PillboxConfig;
pub use error::{ReminderError, Result};
pub use notify::{Delivery, Notifier};
pub use scheduler::{MedicineDirectory, Reminder, ReminderInput, SchedulingEngine, TimeOfDay};
