use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

use crate::breaks::{minutes_between, BreakCalendar};

/// Minutes between `start` and `end` with break time removed. Never negative;
/// an empty or inverted span is worth nothing.
pub fn net_minutes(start: NaiveDateTime, end: NaiveDateTime, calendar: &BreakCalendar) -> f64 {
    if end <= start {
        return 0.0;
    }
    let gross = minutes_between(start, end);
    (gross - calendar.overlap_minutes(start, end)).max(0.0)
}

/// Splits `[start, end)` into clock-aligned hour blocks and returns the net
/// minutes each block contributes, for blocks whose hour lies in
/// `[start_hour, end_hour)` and whose contribution is positive.
pub fn split_by_hour(
    start: NaiveDateTime,
    end: NaiveDateTime,
    calendar: &BreakCalendar,
    start_hour: u32,
    end_hour: u32,
) -> Vec<(u32, f64)> {
    let mut out = Vec::new();
    if end <= start {
        return out;
    }
    let Some(mut block_start) = floor_to_hour(start) else {
        return out;
    };

    while block_start < end {
        let block_end = block_start + Duration::hours(1);
        let s = start.max(block_start);
        let e = end.min(block_end);
        if e > s {
            // Break overlap is recomputed on the block itself.
            let minutes = net_minutes(s, e, calendar);
            let hour = block_start.hour();
            if (start_hour..end_hour).contains(&hour) && minutes > 0.0 {
                out.push((hour, minutes));
            }
        }
        block_start = block_end;
    }
    out
}

fn floor_to_hour(ts: NaiveDateTime) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(ts.hour(), 0, 0)?;
    Some(ts.date().and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakWindow;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn lunch() -> BreakCalendar {
        BreakCalendar::new(&[BreakWindow::parse("13:00-14:30").unwrap()])
    }

    #[test]
    fn without_breaks_net_equals_elapsed() {
        let calendar = BreakCalendar::default();
        assert_eq!(net_minutes(at(4, 9, 0), at(4, 9, 10), &calendar), 10.0);
        assert_eq!(net_minutes(at(4, 22, 30), at(5, 1, 0), &calendar), 150.0);
    }

    #[test]
    fn subtracts_break_overlap() {
        assert_eq!(net_minutes(at(4, 9, 10), at(4, 13, 50), &lunch()), 230.0);
    }

    #[test]
    fn interval_inside_break_is_zero() {
        assert_eq!(net_minutes(at(4, 13, 10), at(4, 14, 0), &lunch()), 0.0);
    }

    #[test]
    fn inverted_interval_is_zero() {
        assert_eq!(net_minutes(at(4, 10, 0), at(4, 9, 0), &lunch()), 0.0);
        assert_eq!(net_minutes(at(4, 10, 0), at(4, 10, 0), &lunch()), 0.0);
    }

    #[test]
    fn wider_breaks_never_increase_net() {
        let start = at(4, 12, 0);
        let end = at(4, 15, 0);
        let mut previous = f64::MAX;
        for end_minute in [5, 20, 45, 59] {
            let spec = format!("13:00-14:{end_minute:02}");
            let calendar = BreakCalendar::new(&[BreakWindow::parse(&spec).unwrap()]);
            let net = net_minutes(start, end, &calendar);
            assert!(net >= 0.0);
            assert!(net <= previous);
            previous = net;
        }
    }

    #[test]
    fn splits_across_hours_excluding_break() {
        let parts = split_by_hour(at(4, 9, 10), at(4, 13, 50), &lunch(), 9, 14);
        assert_eq!(parts, vec![(9, 50.0), (10, 60.0), (11, 60.0), (12, 60.0)]);
        let total: f64 = parts.iter().map(|(_, m)| m).sum();
        assert_eq!(total, 230.0);
    }

    #[test]
    fn split_respects_hour_range() {
        let parts = split_by_hour(at(4, 9, 10), at(4, 13, 50), &lunch(), 10, 12);
        assert_eq!(parts, vec![(10, 60.0), (11, 60.0)]);
    }

    #[test]
    fn split_of_empty_interval_is_empty() {
        assert!(split_by_hour(at(4, 9, 0), at(4, 9, 0), &lunch(), 0, 24).is_empty());
        assert!(split_by_hour(at(4, 10, 0), at(4, 9, 0), &lunch(), 0, 24).is_empty());
    }

    #[test]
    fn split_within_single_hour() {
        let parts = split_by_hour(at(4, 9, 0), at(4, 9, 10), &lunch(), 0, 24);
        assert_eq!(parts, vec![(9, 10.0)]);
    }

    #[test]
    fn split_over_full_day_sums_to_net() {
        let calendar = BreakCalendar::new(&[
            BreakWindow::parse("13:00-14:30").unwrap(),
            BreakWindow::parse("10:15-10:40").unwrap(),
        ]);
        let start = at(4, 8, 47);
        let end = at(6, 11, 3);
        let parts = split_by_hour(start, end, &calendar, 0, 24);
        let total: f64 = parts.iter().map(|(_, m)| m).sum();
        assert!((total - net_minutes(start, end, &calendar)).abs() < 1e-9);
    }

    #[test]
    fn split_follows_chronological_order_across_midnight() {
        let parts = split_by_hour(at(4, 23, 30), at(5, 0, 45), &BreakCalendar::default(), 0, 24);
        assert_eq!(parts, vec![(23, 30.0), (0, 45.0)]);
    }
}
