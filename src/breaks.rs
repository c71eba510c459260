use chrono::NaiveDateTime;

use crate::config::BreakWindow;

/// Recurring daily windows excluded from idle accounting.
///
/// Overlapping or touching windows are merged on construction so a minute is
/// never subtracted twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakCalendar {
    windows: Vec<BreakWindow>,
}

impl BreakCalendar {
    pub fn new(windows: &[BreakWindow]) -> Self {
        let mut sorted = windows.to_vec();
        sorted.sort();

        let mut merged: Vec<BreakWindow> = Vec::with_capacity(sorted.len());
        for window in sorted {
            match merged.last_mut() {
                Some(last) if window.start <= last.end => {
                    last.end = last.end.max(window.end);
                }
                _ => merged.push(window),
            }
        }

        Self { windows: merged }
    }

    pub fn windows(&self) -> &[BreakWindow] {
        &self.windows
    }

    /// Minutes of `[start, end)` that fall inside any break, summed over
    /// every calendar day the span touches.
    pub fn overlap_minutes(&self, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
        if end <= start || self.windows.is_empty() {
            return 0.0;
        }

        let last_day = end.date();
        let mut overlap = 0.0;
        for day in start.date().iter_days().take_while(|day| *day <= last_day) {
            for window in &self.windows {
                let break_start = day.and_time(window.start);
                let break_end = day.and_time(window.end);
                let s = start.max(break_start);
                let e = end.min(break_end);
                if e > s {
                    overlap += minutes_between(s, e);
                }
            }
        }
        overlap
    }
}

pub fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_milliseconds() as f64 / 60_000.0
}
