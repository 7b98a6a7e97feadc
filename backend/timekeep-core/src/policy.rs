// src/policy.rs

use chrono::NaiveTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// --- Policy Constants ---

pub const OVERTIME_RATE_PER_HOUR: Decimal = dec!(35);
pub const DAILY_BASE_CAP: Decimal = dec!(200);
pub const DAILY_BASE_HOURS: Decimal = dec!(8.5);
pub const STAFF_HOUSE_WEEKLY_DEDUCTION: Decimal = dec!(250);

/// Company time and pay policy.
///
/// `shift_end` and `overtime_threshold` are deliberately separate values:
/// payable overtime on an approved request is measured from the end of the
/// shift (15:30), while the employee's live "potential overtime" indicator
/// only starts at the threshold (16:00).
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub overtime_threshold: NaiveTime,
    pub overtime_rate: Decimal,
    pub daily_base_cap: Decimal,
    pub daily_base_hours: Decimal,
    pub staff_house_weekly_deduction: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            shift_start: time_of_day(7, 0),
            shift_end: time_of_day(15, 30),
            overtime_threshold: time_of_day(16, 0),
            overtime_rate: OVERTIME_RATE_PER_HOUR,
            daily_base_cap: DAILY_BASE_CAP,
            daily_base_hours: DAILY_BASE_HOURS,
            staff_house_weekly_deduction: STAFF_HOUSE_WEEKLY_DEDUCTION,
        }
    }
}

impl PolicyConfig {
    /// Hourly value of a regular shift hour (daily cap / shift hours), also used
    /// to price late arrival. Unrounded; callers round the final amount.
    pub fn late_rate(&self) -> Decimal {
        if self.daily_base_hours.is_zero() {
            return Decimal::ZERO;
        }
        self.daily_base_cap / self.daily_base_hours
    }

    /// Length of the regular shift window.
    pub fn shift_length(&self) -> chrono::Duration {
        self.shift_end - self.shift_start
    }
}

fn time_of_day(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_company_rules() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.shift_start, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(policy.shift_end, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(
            policy.overtime_threshold,
            NaiveTime::from_hms_opt(16, 0, 0).unwrap()
        );
        assert_eq!(policy.overtime_rate, dec!(35));
        assert_eq!(policy.staff_house_weekly_deduction, dec!(250));
        assert_eq!(policy.shift_length(), chrono::Duration::minutes(510));
    }

    #[test]
    fn shift_end_and_overtime_threshold_stay_distinct() {
        let policy = PolicyConfig::default();
        assert_ne!(policy.shift_end, policy.overtime_threshold);
    }

    #[test]
    fn late_rate_is_daily_cap_over_shift_hours() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.late_rate().round_dp(2), dec!(23.53));
    }
}
