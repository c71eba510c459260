use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Timelike};

use crate::breaks::BreakCalendar;
use crate::idle::is_qualifying;
use crate::intervals::split_by_hour;
use crate::models::{
    AgentSummary, HeatmapCell, HourMatrix, IdleInterval, Kpis, LinkedEvent, MatrixRow,
};

pub const WEEKDAY_LABELS: [&str; 7] = ["Lun", "Mar", "Mié", "Jue", "Vie", "Sáb", "Dom"];
pub const TOTAL_ROW: &str = "TOTAL";

/// Attempts count every qualifying event; idle minutes only the intervals
/// that passed the threshold. Ordered by agent id.
pub fn by_agent(
    linked: &[LinkedEvent<'_>],
    codes: &BTreeSet<String>,
    intervals: &[IdleInterval],
) -> Vec<AgentSummary> {
    let mut map: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

    for l in linked.iter().filter(|l| is_qualifying(l, codes)) {
        map.entry(l.event.agent_id.as_str()).or_insert((0, 0.0)).0 += 1;
    }
    for interval in intervals {
        map.entry(interval.agent_id.as_str()).or_insert((0, 0.0)).1 += interval.net_minutes;
    }

    map.into_iter()
        .map(|(agent_id, (attempt_count, total_idle_minutes))| AgentSummary {
            agent_id: agent_id.to_string(),
            attempt_count,
            total_idle_minutes,
        })
        .collect()
}

/// Minutes summed by the weekday and hour of the event closing each interval.
pub fn by_hour_weekday(intervals: &[IdleInterval]) -> Vec<HeatmapCell> {
    let mut map: BTreeMap<(u32, u32), f64> = BTreeMap::new();

    for interval in intervals {
        let ts = interval.current_timestamp;
        let key = (ts.weekday().num_days_from_monday(), ts.hour());
        *map.entry(key).or_insert(0.0) += interval.net_minutes;
    }

    map.into_iter()
        .map(|((weekday, hour), minutes)| HeatmapCell {
            weekday,
            weekday_label: WEEKDAY_LABELS[weekday as usize],
            hour,
            minutes,
        })
        .collect()
}

/// Agent by clock-hour matrix over `[start_hour, end_hour)`.
///
/// With `exact_overlap` each interval is spread over the hours it spans, net
/// of breaks; otherwise the whole interval lands on the closing event's hour.
pub fn by_agent_hour_matrix(
    intervals: &[IdleInterval],
    calendar: &BreakCalendar,
    start_hour: u32,
    end_hour: u32,
    exact_overlap: bool,
) -> HourMatrix {
    let mut cells: BTreeMap<&str, BTreeMap<u32, f64>> = BTreeMap::new();

    for interval in intervals {
        let parts = if exact_overlap {
            split_by_hour(
                interval.previous_timestamp,
                interval.current_timestamp,
                calendar,
                start_hour,
                end_hour,
            )
        } else {
            let hour = interval.current_timestamp.hour();
            if (start_hour..end_hour).contains(&hour) {
                vec![(hour, interval.net_minutes)]
            } else {
                Vec::new()
            }
        };

        for (hour, minutes) in parts {
            *cells
                .entry(interval.agent_id.as_str())
                .or_default()
                .entry(hour)
                .or_insert(0.0) += minutes;
        }
    }

    let rows: Vec<MatrixRow> = cells
        .into_iter()
        .map(|(agent_id, by_hour)| matrix_row(agent_id, start_hour, end_hour, &by_hour))
        .collect();

    let mut column_sums: BTreeMap<u32, f64> = BTreeMap::new();
    for row in &rows {
        for (hour, minutes) in &row.minutes_by_hour {
            *column_sums.entry(*hour).or_insert(0.0) += minutes;
        }
    }
    let total = matrix_row(TOTAL_ROW, start_hour, end_hour, &column_sums);

    HourMatrix {
        start_hour,
        end_hour,
        exact_overlap,
        rows,
        total,
    }
}

fn matrix_row(
    agent_id: &str,
    start_hour: u32,
    end_hour: u32,
    by_hour: &BTreeMap<u32, f64>,
) -> MatrixRow {
    let minutes_by_hour: BTreeMap<u32, f64> = (start_hour..end_hour)
        .map(|hour| (hour, by_hour.get(&hour).copied().unwrap_or(0.0)))
        .collect();
    let total_minutes = minutes_by_hour.values().sum();
    MatrixRow {
        agent_id: agent_id.to_string(),
        minutes_by_hour,
        total_minutes,
    }
}

pub fn kpis(summaries: &[AgentSummary]) -> Kpis {
    let total_idle_minutes: f64 = summaries.iter().map(|s| s.total_idle_minutes).sum();
    let mean_idle_minutes_per_agent = if summaries.is_empty() {
        0.0
    } else {
        total_idle_minutes / summaries.len() as f64
    };

    let mut top: Option<&AgentSummary> = None;
    for summary in summaries {
        if top.map_or(true, |best| summary.total_idle_minutes > best.total_idle_minutes) {
            top = Some(summary);
        }
    }

    Kpis {
        total_idle_minutes,
        mean_idle_minutes_per_agent,
        top_agent: top.map(|s| s.agent_id.clone()),
    }
}
