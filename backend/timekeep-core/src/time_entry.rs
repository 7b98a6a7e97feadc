// src/time_entry.rs

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::warn;

use crate::api_client::TimeEntryRecord;
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::overtime::{ApprovalStatus, OvertimeState};
use crate::policy::PolicyConfig;
use crate::time_policy::{
    is_after_overtime_threshold, is_late, late_duration, live_overtime, payable_overtime,
    worked_duration,
};

/// One work session, in local wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: u64,
    pub clock_in: NaiveDateTime,
    /// `None` while the session is still active.
    pub clock_out: Option<NaiveDateTime>,
    pub overtime: OvertimeState,
}

impl TimeEntry {
    pub fn from_record(record: TimeEntryRecord, clock: &dyn Clock) -> Result<Self, ValidationError> {
        let clock_in = clock.to_local(record.clock_in);
        let clock_out = record.clock_out.map(|t| clock.to_local(t));

        if let Some(clock_out) = clock_out {
            if clock_out < clock_in {
                warn!(
                    "Rejecting entry {}: clock-out {} precedes clock-in {}",
                    record.id, clock_out, clock_in
                );
                return Err(ValidationError::ClockOutBeforeClockIn {
                    entry_id: record.id,
                    clock_in,
                    clock_out,
                });
            }
        }

        let overtime = if record.overtime_requested {
            OvertimeState::Requested {
                note: record.overtime_note.unwrap_or_default(),
                status: record.overtime_approved,
            }
        } else {
            OvertimeState::None
        };

        Ok(Self {
            id: record.id,
            clock_in,
            clock_out,
            overtime,
        })
    }

    pub fn is_active(&self) -> bool {
        self.clock_out.is_none()
    }

    pub fn work_date(&self) -> NaiveDate {
        self.clock_in.date()
    }

    pub fn worked(&self, now: NaiveDateTime) -> Duration {
        worked_duration(self.clock_in, self.clock_out, now)
    }

    pub fn is_late(&self, policy: &PolicyConfig) -> bool {
        is_late(self.clock_in, policy.shift_start)
    }

    pub fn late_by(&self, policy: &PolicyConfig) -> Duration {
        late_duration(self.clock_in, policy.shift_start)
    }

    /// Overtime past shift end for a closed session; zero while active.
    pub fn payable_overtime(&self, policy: &PolicyConfig) -> Duration {
        match self.clock_out {
            Some(clock_out) => payable_overtime(self.clock_in, clock_out, policy),
            None => Duration::zero(),
        }
    }

    pub fn approval(&self) -> Option<ApprovalStatus> {
        self.overtime.status()
    }
}

/// What the employee sees for today.
#[derive(Debug, Clone, PartialEq)]
pub enum TodayStatus {
    NotClockedIn,
    Active(TimeEntry),
    Completed(TimeEntry),
}

impl TodayStatus {
    pub fn from_entry(entry: Option<TimeEntry>) -> Self {
        match entry {
            None => TodayStatus::NotClockedIn,
            Some(entry) if entry.is_active() => TodayStatus::Active(entry),
            Some(entry) => TodayStatus::Completed(entry),
        }
    }

    pub fn entry(&self) -> Option<&TimeEntry> {
        match self {
            TodayStatus::NotClockedIn => None,
            TodayStatus::Active(entry) | TodayStatus::Completed(entry) => Some(entry),
        }
    }
}

/// Advisory figures recomputed on every display tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSnapshot {
    pub now: NaiveDateTime,
    pub worked: Duration,
    pub late_by: Duration,
    /// Time past the overtime threshold; only while the session is active.
    pub potential_overtime: Duration,
    pub past_overtime_threshold: bool,
}

impl LiveSnapshot {
    pub fn of(entry: &TimeEntry, now: NaiveDateTime, policy: &PolicyConfig) -> Self {
        let active = entry.is_active();
        Self {
            now,
            worked: entry.worked(now),
            late_by: entry.late_by(policy),
            potential_overtime: if active {
                live_overtime(now, policy)
            } else {
                Duration::zero()
            },
            past_overtime_threshold: active
                && is_after_overtime_threshold(now, policy.overtime_threshold),
        }
    }
}
