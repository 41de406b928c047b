//! Worked-hours calculation for clock-in/clock-out pairs.
//!
//! Every place that derives hours from an attendance (clock-out, historical
//! recalculation, cost aggregation) goes through this module.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Presence at or above this many hours triggers the unpaid lunch break.
pub const LUNCH_BREAK_THRESHOLD_HOURS: i64 = 6;

/// Hours deducted for the unpaid lunch break.
pub const LUNCH_BREAK_HOURS: i64 = 1;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Result of [`calculate_worked_hours`], rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedHours {
    pub presence_hours: Decimal,
    pub worked_hours: Decimal,
    pub lunch_break_applied: bool,
}

/// Rounds to two decimals, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Unrounded hours elapsed between two instants; negative spans count as zero.
pub fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> Decimal {
    let millis = (to - from).num_milliseconds().max(0);
    Decimal::from(millis) / Decimal::from(MILLIS_PER_HOUR)
}

/// Presence and worked hours of a completed shift.
///
/// A shift of six hours or more loses exactly one unpaid hour. The threshold
/// is checked on the unrounded presence.
pub fn calculate_worked_hours(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> WorkedHours {
    let presence = elapsed_hours(clock_in, clock_out);
    let lunch_break_applied = presence >= Decimal::from(LUNCH_BREAK_THRESHOLD_HOURS);
    let worked = if lunch_break_applied {
        (presence - Decimal::from(LUNCH_BREAK_HOURS)).max(Decimal::ZERO)
    } else {
        presence
    };

    WorkedHours {
        presence_hours: round2(presence),
        worked_hours: round2(worked),
        lunch_break_applied,
    }
}

/// Provisional hours of a shift that is still open at `now`.
///
/// The lunch break is only applied at clock-out, so live projections never
/// deduct it.
pub fn live_hours(clock_in: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
    elapsed_hours(clock_in, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
    }

    #[test]
    fn test_long_shift_applies_lunch_break() {
        let hours = calculate_worked_hours(at(8, 0), at(14, 30));
        assert_eq!(hours.presence_hours, Decimal::new(65, 1));
        assert_eq!(hours.worked_hours, Decimal::new(55, 1));
        assert!(hours.lunch_break_applied);
    }

    #[test]
    fn test_short_shift_has_no_lunch_break() {
        let hours = calculate_worked_hours(at(8, 0), at(13, 30));
        assert_eq!(hours.presence_hours, Decimal::new(55, 1));
        assert_eq!(hours.worked_hours, Decimal::new(55, 1));
        assert!(!hours.lunch_break_applied);
    }

    #[test]
    fn test_empty_shift_is_all_zero() {
        let hours = calculate_worked_hours(at(8, 0), at(8, 0));
        assert_eq!(hours.presence_hours, Decimal::ZERO);
        assert_eq!(hours.worked_hours, Decimal::ZERO);
        assert!(!hours.lunch_break_applied);
    }

    #[test]
    fn test_exactly_six_hours_applies_break() {
        let hours = calculate_worked_hours(at(7, 0), at(13, 0));
        assert!(hours.lunch_break_applied);
        assert_eq!(hours.worked_hours, Decimal::from(5));
    }

    #[test]
    fn test_just_under_threshold_keeps_presence() {
        let clock_in = at(7, 0);
        let clock_out = clock_in + Duration::hours(6) - Duration::seconds(1);
        let hours = calculate_worked_hours(clock_in, clock_out);
        assert!(!hours.lunch_break_applied);
        assert_eq!(hours.presence_hours, Decimal::new(600, 2));
    }

    #[test]
    fn test_clock_out_before_clock_in_is_zero() {
        let hours = calculate_worked_hours(at(10, 0), at(9, 0));
        assert_eq!(hours.presence_hours, Decimal::ZERO);
        assert_eq!(hours.worked_hours, Decimal::ZERO);
    }

    #[test]
    fn test_rounding_two_decimals() {
        // 20 minutes = 0.3333.. hours
        let hours = calculate_worked_hours(at(8, 0), at(8, 20));
        assert_eq!(hours.presence_hours, Decimal::new(33, 2));

        assert_eq!(round2(Decimal::new(1005, 3)), Decimal::new(101, 2));
        assert_eq!(round2(Decimal::new(-1005, 3)), Decimal::new(-101, 2));
    }

    #[test]
    fn test_live_hours_has_no_lunch_deduction() {
        let now = at(16, 0);
        assert_eq!(live_hours(at(8, 0), now), Decimal::from(8));
        assert_eq!(live_hours(at(14, 0), now), Decimal::from(2));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(calculate_worked_hours(at(8, 0), at(14, 30))).unwrap();
        assert_eq!(json["presenceHours"], serde_json::json!(6.5));
        assert_eq!(json["lunchBreakApplied"], serde_json::json!(true));
    }
}
