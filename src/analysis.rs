use log::{debug, info};
use serde::Serialize;

use crate::aggregate;
use crate::breaks::BreakCalendar;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::idle;
use crate::ingest;
use crate::linker;
use crate::models::{AgentSummary, Event, HeatmapCell, HourMatrix, IdleInterval, Kpis};

/// Every view derived from one event log under one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub qualifying_events: usize,
    pub summaries: Vec<AgentSummary>,
    /// Ordered by agent, then closing timestamp.
    pub intervals: Vec<IdleInterval>,
    pub heatmap: Vec<HeatmapCell>,
    pub matrix: HourMatrix,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Nothing left after the date and agent filters.
    NoEventsInScope,
    /// Events exist but none carries a qualifying status code.
    NoQualifyingEvents,
    Ready(Box<Analysis>),
}

pub fn run(events: Vec<Event>, config: &AnalysisConfig) -> Result<AnalysisOutcome> {
    config.validate()?;

    let events = ingest::apply_scope(events, config);
    if events.is_empty() {
        return Ok(AnalysisOutcome::NoEventsInScope);
    }

    let linked = linker::link_previous(&events);
    let qualifying_events = linked
        .iter()
        .filter(|l| idle::is_qualifying(l, &config.qualifying_codes))
        .count();
    if qualifying_events == 0 {
        return Ok(AnalysisOutcome::NoQualifyingEvents);
    }

    let calendar = BreakCalendar::new(&config.breaks);
    debug!("break calendar: {:?}", calendar.windows());

    let intervals = idle::extract(
        &linked,
        &config.qualifying_codes,
        &calendar,
        config.min_interval_minutes,
    );
    let summaries = aggregate::by_agent(&linked, &config.qualifying_codes, &intervals);
    let heatmap = aggregate::by_hour_weekday(&intervals);
    let matrix = aggregate::by_agent_hour_matrix(
        &intervals,
        &calendar,
        config.start_hour,
        config.end_hour,
        config.exact_overlap,
    );
    let kpis = aggregate::kpis(&summaries);

    info!(
        "{} qualifying events, {} idle intervals across {} agents",
        qualifying_events,
        intervals.len(),
        summaries.len()
    );

    Ok(AnalysisOutcome::Ready(Box::new(Analysis {
        qualifying_events,
        summaries,
        intervals,
        heatmap,
        matrix,
        kpis,
    })))
}
