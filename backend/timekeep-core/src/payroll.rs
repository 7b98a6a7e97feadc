// src/payroll.rs

//! Pay preview for closed and active sessions.
//!
//! Base pay accrues at the late rate from shift start onwards and is capped
//! per day. Overtime is only paid once approved. Staff-house residents have a
//! fixed weekly deduction.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::overtime::ApprovalStatus;
use crate::policy::PolicyConfig;
use crate::time_entry::TimeEntry;
use crate::time_policy::{
    boundary_on, exact_hours, overtime_pay, pay_hours, round_money, worked_duration,
};

/// Time that counts towards base pay: work before shift start is ignored.
pub fn counted_duration(entry: &TimeEntry, now: NaiveDateTime, policy: &PolicyConfig) -> Duration {
    let shift_start = boundary_on(entry.clock_in, policy.shift_start);
    let start = entry.clock_in.max(shift_start);
    worked_duration(start, entry.clock_out, now)
}

pub fn counted_hours(entry: &TimeEntry, now: NaiveDateTime, policy: &PolicyConfig) -> Decimal {
    pay_hours(counted_duration(entry, now, policy))
}

pub fn daily_base_pay(counted: Duration, policy: &PolicyConfig) -> Decimal {
    let earned = exact_hours(counted) * policy.late_rate();
    round_money(earned.min(policy.daily_base_cap))
}

/// Part of the daily cap forfeited by arriving late.
pub fn late_penalty(late_by: Duration, policy: &PolicyConfig) -> Decimal {
    round_money(exact_hours(late_by) * policy.late_rate())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPay {
    pub date: NaiveDate,
    pub counted_hours: Decimal,
    pub base_pay: Decimal,
    pub late_penalty: Decimal,
    pub overtime_hours: Decimal,
    /// Zero unless the overtime request was approved.
    pub overtime_pay: Decimal,
}

impl DailyPay {
    pub fn for_entry(entry: &TimeEntry, now: NaiveDateTime, policy: &PolicyConfig) -> Self {
        let counted = counted_duration(entry, now, policy);
        let overtime_hours = pay_hours(entry.payable_overtime(policy));
        let overtime_pay = match entry.approval() {
            Some(ApprovalStatus::Approved) => overtime_pay(overtime_hours, policy),
            _ => Decimal::ZERO,
        };

        Self {
            date: entry.work_date(),
            counted_hours: pay_hours(counted),
            base_pay: daily_base_pay(counted, policy),
            late_penalty: late_penalty(entry.late_by(policy), policy),
            overtime_hours,
            overtime_pay,
        }
    }

    pub fn total(&self) -> Decimal {
        self.base_pay + self.overtime_pay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPay {
    pub days: Vec<DailyPay>,
    pub gross: Decimal,
    pub staff_house_deduction: Decimal,
    pub net: Decimal,
}

impl WeeklyPay {
    pub fn summarize(days: Vec<DailyPay>, staff_house: bool, policy: &PolicyConfig) -> Self {
        let gross: Decimal = days.iter().map(DailyPay::total).sum();
        let staff_house_deduction = if staff_house {
            policy.staff_house_weekly_deduction
        } else {
            Decimal::ZERO
        };
        let net = (gross - staff_house_deduction).max(Decimal::ZERO);

        Self {
            days,
            gross,
            staff_house_deduction,
            net,
        }
    }
}
