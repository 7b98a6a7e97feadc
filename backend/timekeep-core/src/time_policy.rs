// src/time_policy.rs

//! Duration, lateness and overtime rules for a single work session.
//!
//! Everything here is pure: callers pass in "now" explicitly. Durations are
//! millisecond-precision `chrono::Duration`s and never negative.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::*;
use std::fmt;

use crate::overtime::OvertimeRequest;
use crate::policy::PolicyConfig;

const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;

fn clamp_non_negative(duration: Duration) -> Duration {
    if duration < Duration::zero() {
        Duration::zero()
    } else {
        duration
    }
}

/// Anchors a policy time-of-day to the calendar day of `moment`.
pub fn boundary_on(moment: NaiveDateTime, time_of_day: NaiveTime) -> NaiveDateTime {
    moment.date().and_time(time_of_day)
}

// --- Duration & penalty calculator ---

/// Elapsed time of a session. An open session (`clock_out == None`) is
/// measured up to `now`.
pub fn worked_duration(
    clock_in: NaiveDateTime,
    clock_out: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Duration {
    let end = clock_out.unwrap_or(now);
    clamp_non_negative(end - clock_in)
}

pub fn is_late(clock_in: NaiveDateTime, shift_start: NaiveTime) -> bool {
    clock_in > boundary_on(clock_in, shift_start)
}

pub fn late_duration(clock_in: NaiveDateTime, shift_start: NaiveTime) -> Duration {
    clamp_non_negative(clock_in - boundary_on(clock_in, shift_start))
}

/// Time-of-day comparison only; the threshold is always today's.
pub fn is_after_overtime_threshold(now: NaiveDateTime, overtime_threshold: NaiveTime) -> bool {
    now.time() > overtime_threshold
}

pub fn overtime_duration(clock_out_or_now: NaiveDateTime, boundary: NaiveDateTime) -> Duration {
    clamp_non_negative(clock_out_or_now - boundary)
}

/// Overtime payable on a request: measured from shift end on the clock-in day.
pub fn payable_overtime(
    clock_in: NaiveDateTime,
    clock_out: NaiveDateTime,
    policy: &PolicyConfig,
) -> Duration {
    overtime_duration(clock_out, boundary_on(clock_in, policy.shift_end))
}

/// Potential overtime shown to a clocked-in employee: measured from today's
/// overtime threshold, and zero until the threshold has passed.
pub fn live_overtime(now: NaiveDateTime, policy: &PolicyConfig) -> Duration {
    if !is_after_overtime_threshold(now, policy.overtime_threshold) {
        return Duration::zero();
    }
    overtime_duration(now, boundary_on(now, policy.overtime_threshold))
}

// --- Unit conversion ---

pub fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_HOUR as f64
}

/// Hours for pay purposes, exact to the millisecond and rounded to 2dp.
pub fn pay_hours(duration: Duration) -> Decimal {
    round_money(exact_hours(duration))
}

/// Unrounded hours, for amounts that are rounded only once at the end.
pub(crate) fn exact_hours(duration: Duration) -> Decimal {
    let millis = Decimal::from(clamp_non_negative(duration).num_milliseconds());
    millis / Decimal::from(MILLIS_PER_HOUR)
}

pub(crate) fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncated hours/minutes/seconds for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationBreakdown {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl From<Duration> for DurationBreakdown {
    fn from(duration: Duration) -> Self {
        let total_seconds = clamp_non_negative(duration).num_seconds();
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
        }
    }
}

impl fmt::Display for DurationBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m {}s", self.hours, self.minutes, self.seconds)
    }
}

// --- Overtime pay calculator ---

pub fn overtime_pay(hours: Decimal, policy: &PolicyConfig) -> Decimal {
    if hours <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(hours * policy.overtime_rate)
}

/// Dashboard aggregate: pay over the requests still pending. Decided requests
/// contribute nothing.
pub fn aggregate_overtime_pay<'a>(
    requests: impl IntoIterator<Item = &'a OvertimeRequest>,
    policy: &PolicyConfig,
) -> Decimal {
    requests
        .into_iter()
        .filter(|r| r.status.is_pending())
        .map(|r| r.overtime_pay(policy))
        .sum()
}
