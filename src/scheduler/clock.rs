//! Wall-clock sources for trigger computation and fire-time weekday checks.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use std::sync::{Mutex, PoisonError};

/// Source of "now" in the device's local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Time zone used to resolve local times of day.
    type Tz: TimeZone;

    /// Current instant in local time.
    fn now(&self) -> DateTime<Self::Tz>;
}

/// The system clock in the device's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to, in a fixed UTC offset.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for ManualClock {
    type Tz = FixedOffset;

    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let start = DateTime::parse_from_rfc3339("2024-06-02T09:00:00+00:00").unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), start + chrono::Duration::hours(2));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn system_clock_is_close_to_utc_now() {
        let local = SystemClock.now();
        let delta = (chrono::Utc::now() - local.with_timezone(&chrono::Utc))
            .num_seconds()
            .abs();
        assert!(delta < 5, "system clock drifted by {delta}s");
    }
}
