// src/clock.rs

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Source of "now" for everything that compares against the wall clock.
///
/// All policy calculations run on local wall-clock time; collaborator
/// timestamps arrive as UTC and are converted through the clock so that a
/// test clock can pin both the current instant and the zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Host clock in the host's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }
}

#[derive(Clone)]
pub struct TestClock {
    current_time: Arc<Mutex<NaiveDateTime>>,
    offset: FixedOffset,
}

impl TestClock {
    /// Clock pinned at `start` in UTC.
    pub fn at(start: NaiveDateTime) -> Self {
        Self::with_offset(start, Utc.fix())
    }

    pub fn with_offset(start: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
            offset,
        }
    }

    /// Parses `"%Y-%m-%d %H:%M:%S"`.
    pub fn parse(datetime_str: &str) -> Result<Self, chrono::ParseError> {
        let dt = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S")?;
        Ok(Self::at(dt))
    }

    pub fn set_time(&self, datetime: NaiveDateTime) {
        *self.lock() = datetime;
    }

    pub fn advance(&self, duration: Duration) {
        let mut guard = self.lock();
        *guard += duration;
        debug!("Test clock advanced to {}", *guard);
    }

    fn lock(&self) -> MutexGuard<'_, NaiveDateTime> {
        self.current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for TestClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }
}

/// Detects calendar-day changes so "today's" cached entry can be refreshed.
///
/// The first observation always counts as a change.
#[derive(Debug, Clone, Default)]
pub struct DayRollover {
    last_checked: Option<NaiveDate>,
}

impl DayRollover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a known day, so checking that same day reports no change.
    pub fn seeded(day: NaiveDate) -> Self {
        Self {
            last_checked: Some(day),
        }
    }

    pub fn check(&mut self, today: NaiveDate) -> bool {
        if self.last_checked == Some(today) {
            return false;
        }
        debug!(previous = ?self.last_checked, %today, "Calendar day changed");
        self.last_checked = Some(today);
        true
    }

    pub fn last_checked(&self) -> Option<NaiveDate> {
        self.last_checked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clock_advances_and_reports_today() {
        let clock = TestClock::parse("2025-03-03 23:59:30").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());

        clock.advance(Duration::seconds(45));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(
            clock.now(),
            NaiveDate::from_ymd_opt(2025, 3, 4)
                .unwrap()
                .and_hms_opt(0, 0, 15)
                .unwrap()
        );
    }

    #[test]
    fn test_clock_converts_utc_with_its_offset() {
        let manila = FixedOffset::east_opt(8 * 3600).unwrap();
        let clock = TestClock::with_offset(
            NaiveDate::from_ymd_opt(2025, 3, 3)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            manila,
        );
        let instant = Utc.with_ymd_and_hms(2025, 3, 2, 23, 5, 0).unwrap();
        assert_eq!(
            clock.to_local(instant),
            NaiveDate::from_ymd_opt(2025, 3, 3)
                .unwrap()
                .and_hms_opt(7, 5, 0)
                .unwrap()
        );
    }

    #[test]
    fn day_rollover_reports_first_check_and_each_new_day_once() {
        let mut rollover = DayRollover::new();
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let tuesday = monday.succ_opt().unwrap();

        assert!(rollover.check(monday));
        assert!(!rollover.check(monday));
        assert!(rollover.check(tuesday));
        assert!(!rollover.check(tuesday));
        assert_eq!(rollover.last_checked(), Some(tuesday));
    }

    #[test]
    fn seeded_rollover_ignores_the_seed_day() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let mut rollover = DayRollover::seeded(monday);
        assert!(!rollover.check(monday));
        assert!(rollover.check(monday.succ_opt().unwrap()));
    }
}
