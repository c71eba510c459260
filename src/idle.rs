use std::collections::BTreeSet;

use log::debug;

use crate::breaks::BreakCalendar;
use crate::intervals::net_minutes;
use crate::models::{IdleInterval, LinkedEvent};

pub fn is_qualifying(linked: &LinkedEvent<'_>, codes: &BTreeSet<String>) -> bool {
    codes.contains(&linked.event.status_code)
}

/// Idle intervals closed by a qualifying event, measured from the agent's
/// previous event of any code and kept when at least `min_minutes` long.
/// A predecessor sharing the event's timestamp opens no interval.
pub fn extract(
    linked: &[LinkedEvent<'_>],
    codes: &BTreeSet<String>,
    calendar: &BreakCalendar,
    min_minutes: f64,
) -> Vec<IdleInterval> {
    let intervals: Vec<IdleInterval> = linked
        .iter()
        .filter(|l| is_qualifying(l, codes))
        .filter_map(|l| {
            let previous = l.previous.filter(|p| p.timestamp < l.event.timestamp)?;
            let minutes = net_minutes(previous.timestamp, l.event.timestamp, calendar);
            (minutes >= min_minutes).then(|| IdleInterval {
                agent_id: l.event.agent_id.clone(),
                previous_timestamp: previous.timestamp,
                current_timestamp: l.event.timestamp,
                status_code: l.event.raw_status_code.clone(),
                net_minutes: minutes,
            })
        })
        .collect();

    debug!(
        "extracted {} idle intervals (threshold {min_minutes} min)",
        intervals.len()
    );
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, BreakWindow};
    use crate::linker::link_previous;
    use crate::models::Event;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn event(agent: &str, h: u32, m: u32, code: &str) -> Event {
        Event {
            agent_id: agent.to_string(),
            timestamp: at(h, m),
            status_code: code.to_lowercase(),
            raw_status_code: code.to_string(),
        }
    }

    fn lunch() -> BreakCalendar {
        BreakCalendar::new(&[BreakWindow::parse("13:00-14:30").unwrap()])
    }

    fn codes() -> BTreeSet<String> {
        AnalysisConfig::default().qualifying_codes
    }

    #[test]
    fn measures_from_previous_event_of_any_code() {
        let events = vec![
            event("A1", 9, 0, "Contacto"),
            event("A1", 9, 10, "NoContacto"),
            event("A1", 13, 50, "Inubicado"),
        ];
        let linked = link_previous(&events);
        let intervals = extract(&linked, &codes(), &lunch(), 5.0);

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].previous_timestamp, at(9, 0));
        assert_eq!(intervals[0].current_timestamp, at(9, 10));
        assert_eq!(intervals[0].net_minutes, 10.0);
        assert_eq!(intervals[1].previous_timestamp, at(9, 10));
        assert_eq!(intervals[1].status_code, "Inubicado");
        assert_eq!(intervals[1].net_minutes, 230.0);
    }

    #[test]
    fn drops_intervals_below_threshold() {
        let events = vec![event("A1", 9, 10, "Contacto"), event("A1", 9, 12, "NoContacto")];
        let linked = link_previous(&events);
        assert!(extract(&linked, &codes(), &lunch(), 5.0).is_empty());
    }

    #[test]
    fn first_event_of_agent_opens_nothing() {
        let events = vec![event("A1", 9, 10, "NoContacto")];
        let linked = link_previous(&events);
        assert!(extract(&linked, &codes(), &lunch(), 0.0).is_empty());
    }

    #[test]
    fn zero_threshold_keeps_every_linked_qualifying_event() {
        let events = vec![
            event("A1", 9, 0, "NoContacto"),
            event("A1", 9, 1, "Contacto"),
            event("A1", 13, 20, "Inubicado"),
            event("B2", 8, 0, "Inubicado"),
            event("B2", 8, 3, "Inubicado"),
        ];
        let linked = link_previous(&events);
        let eligible = linked
            .iter()
            .filter(|l| is_qualifying(l, &codes()) && l.previous.is_some())
            .count();
        let intervals = extract(&linked, &codes(), &lunch(), 0.0);
        assert_eq!(intervals.len(), eligible);
        assert!(intervals.iter().all(|i| i.net_minutes >= 0.0));
        assert!(extract(&linked, &codes(), &lunch(), 5.0).len() <= eligible);
    }

    #[test]
    fn simultaneous_events_open_no_interval() {
        let events = vec![event("A1", 9, 0, "Contacto"), event("A1", 9, 0, "NoContacto")];
        let linked = link_previous(&events);
        assert!(extract(&linked, &codes(), &lunch(), 0.0).is_empty());
    }

    #[test]
    fn empty_input_yields_no_intervals() {
        assert!(extract(&[], &codes(), &lunch(), 5.0).is_empty());
    }
}
