use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::config::{normalize_code, AnalysisConfig};
use crate::models::Event;

pub const DATE_COLUMN: &str = "FchCreacion";
pub const TIME_COLUMN: &str = "HraCreacion";
pub const AGENT_COLUMN: &str = "Gestor";
pub const CODE_COLUMN: &str = "GstCodigo";

const TIMESTAMP_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read: usize,
    /// Records the CSV reader rejected, including ones with a field count
    /// that differs from the header.
    pub unreadable_rows: usize,
    /// Rows with an unparsable timestamp or a blank agent.
    pub malformed_rows: usize,
    pub events: usize,
}

pub fn load_events(csv_path: &Path) -> anyhow::Result<(Vec<Event>, IngestStats)> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    read_events(file).with_context(|| format!("failed to read {}", csv_path.display()))
}

#[derive(serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "FchCreacion")]
    date: String,
    #[serde(rename = "HraCreacion")]
    time: String,
    #[serde(rename = "Gestor")]
    agent: String,
    #[serde(rename = "GstCodigo")]
    code: String,
}

pub fn read_events<R: Read>(mut source: R) -> anyhow::Result<(Vec<Event>, IngestStats)> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    let text = decode(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers = reader.headers()?.clone();
    for name in [DATE_COLUMN, TIME_COLUMN, AGENT_COLUMN, CODE_COLUMN] {
        if !headers.iter().any(|header| header == name) {
            anyhow::bail!("the file is missing the required column '{name}'");
        }
    }

    let mut stats = IngestStats::default();
    let mut events = Vec::new();

    for result in reader.deserialize::<CsvRow>() {
        stats.rows_read += 1;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                debug!("skipping unreadable row: {err}");
                stats.unreadable_rows += 1;
                continue;
            }
        };

        match parse_row(&row.date, &row.time, &row.agent, &row.code) {
            Some(event) => events.push(event),
            None => stats.malformed_rows += 1,
        }
    }

    stats.events = events.len();
    if stats.unreadable_rows + stats.malformed_rows > 0 {
        warn!(
            "dropped {} of {} rows ({} unreadable, {} malformed)",
            stats.unreadable_rows + stats.malformed_rows,
            stats.rows_read,
            stats.unreadable_rows,
            stats.malformed_rows
        );
    }
    debug!("parsed {} events", stats.events);

    Ok((events, stats))
}

/// Builds an event from the four raw fields, or `None` when the row must be
/// dropped.
pub fn parse_row(date: &str, time: &str, agent: &str, code: &str) -> Option<Event> {
    let agent_id = agent.trim();
    if agent_id.is_empty() {
        return None;
    }
    let timestamp = parse_timestamp(date, time)?;
    Some(Event {
        agent_id: agent_id.to_string(),
        timestamp,
        status_code: normalize_code(code),
        raw_status_code: code.trim().to_string(),
    })
}

pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let combined = format!("{} {}", date.trim(), time.trim());
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&combined, format).ok())
}

/// Keeps the events inside the configured date range and agent selection.
/// A reversed date range is ignored.
pub fn apply_scope(events: Vec<Event>, config: &AnalysisConfig) -> Vec<Event> {
    let (from, to) = match (config.date_from, config.date_to) {
        (Some(from), Some(to)) if from > to => {
            warn!("date range {from}..{to} is reversed; using the full range");
            (None, None)
        }
        range => range,
    };

    let before = events.len();
    let scoped: Vec<Event> = events
        .into_iter()
        .filter(|event| {
            let date = event.timestamp.date();
            from.map_or(true, |from| date >= from)
                && to.map_or(true, |to| date <= to)
                && (config.agents.is_empty() || config.agents.contains(&event.agent_id))
        })
        .collect();
    debug!("{} of {} events in scope", scoped.len(), before);
    scoped
}

/// UTF-8 when valid, Latin-1 otherwise.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
