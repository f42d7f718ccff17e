//! Next-fire computation for reminders.
//!
//! [`TriggerCalculator::compute_delay`] walks forward one calendar day at a
//! time from "now" until it finds a day admitted by the reminder's
//! [`DayFilter`] whose local time-of-day instant lies strictly in the future.
//! Offsets `0..=scan_days` are checked, so "today, next week" is reachable when
//! today is the only admitted weekday and the time has already passed.

use crate::config::SchedulerConfig;
use crate::scheduler::reminder::{DayFilter, TimeOfDay};
use chrono::{DateTime, Datelike, Days, NaiveDateTime, TimeZone};
use std::time::Duration;
use tracing::debug;

/// Computes delays until the next qualifying trigger instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerCalculator {
    scan_days: u32,
    fallback: Duration,
}

impl Default for TriggerCalculator {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl TriggerCalculator {
    /// Create a calculator scanning `scan_days` days past today.
    #[must_use]
    pub fn new(scan_days: u32, fallback: Duration) -> Self {
        Self {
            scan_days,
            fallback,
        }
    }

    /// Build from scheduler settings.
    #[must_use]
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.scan_days(), config.fallback_delay())
    }

    /// Delay from `now` until the next qualifying trigger, in whole
    /// milliseconds and never zero.
    ///
    /// Falls back to the configured delay (24 hours by default) when no day
    /// in the scan window qualifies.
    pub fn compute_delay<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        time: TimeOfDay,
        filter: DayFilter,
    ) -> Duration {
        match self.next_trigger(now, time, filter) {
            Some(candidate) => {
                let millis = (candidate - now.clone()).num_milliseconds().max(1);
                Duration::from_millis(u64::try_from(millis).unwrap_or(1))
            }
            None => {
                debug!(
                    "no qualifying day within {} days of {time}, using fallback delay",
                    self.scan_days
                );
                self.fallback
            }
        }
    }

    /// Instant of the next fire, `now + compute_delay(..)`.
    pub fn next_fire_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        time: TimeOfDay,
        filter: DayFilter,
    ) -> DateTime<Tz> {
        let delay = self.compute_delay(now, time, filter);
        let delta = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        now.clone() + delta
    }

    /// First admitted local instant strictly after `now`, if any within the
    /// scan window.
    ///
    /// Local times skipped by a DST gap move forward past the gap; ambiguous
    /// local times resolve to the earlier instant.
    fn next_trigger<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        time: TimeOfDay,
        filter: DayFilter,
    ) -> Option<DateTime<Tz>> {
        let today = now.date_naive();
        let tz = now.timezone();

        for offset in 0..=self.scan_days {
            let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
                break;
            };
            if !filter.admits(date.weekday()) {
                continue;
            }
            let Some(candidate) = resolve_local(&tz, date.and_time(time.as_naive())) else {
                continue;
            };
            if candidate > *now {
                return Some(candidate);
            }
        }
        None
    }
}

/// Map a local wall-clock time to an instant in `tz`.
///
/// A time inside a DST gap is shifted forward by the (one hour) gap, so
/// 02:30 on a spring-forward night becomes 03:30 of the new offset.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&local).earliest().or_else(|| {
        let shifted = local.checked_add_signed(chrono::Duration::hours(1))?;
        tz.from_local_datetime(&shifted).earliest()
    })
}
