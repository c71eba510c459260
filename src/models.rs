use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

/// One contact attempt logged for an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub agent_id: String,
    pub timestamp: NaiveDateTime,
    /// Trimmed, lowercased code used for matching.
    pub status_code: String,
    /// Code as it appeared in the source file.
    pub raw_status_code: String,
}

/// An event plus the agent's immediately preceding event, if any.
#[derive(Debug, Clone, Copy)]
pub struct LinkedEvent<'a> {
    pub event: &'a Event,
    pub previous: Option<&'a Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdleInterval {
    pub agent_id: String,
    pub previous_timestamp: NaiveDateTime,
    pub current_timestamp: NaiveDateTime,
    /// Code of the closing event as it appeared in the source file.
    pub status_code: String,
    pub net_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub attempt_count: usize,
    pub total_idle_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    /// 0 = Monday .. 6 = Sunday.
    pub weekday: u32,
    pub weekday_label: &'static str,
    pub hour: u32,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub agent_id: String,
    /// Every hour of the configured range, zero-filled.
    pub minutes_by_hour: BTreeMap<u32, f64>,
    pub total_minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourMatrix {
    pub start_hour: u32,
    pub end_hour: u32,
    pub exact_overlap: bool,
    pub rows: Vec<MatrixRow>,
    /// Column sums across agents, labelled `TOTAL`.
    pub total: MatrixRow,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_idle_minutes: f64,
    pub mean_idle_minutes_per_agent: f64,
    pub top_agent: Option<String>,
}
