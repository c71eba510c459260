use crate::models::{Event, LinkedEvent};

/// Links every event to the same agent's previous event, whatever its code.
///
/// Output is grouped by agent (lexical) and ordered by timestamp inside each
/// group; events sharing a timestamp keep their input order.
pub fn link_previous(events: &[Event]) -> Vec<LinkedEvent<'_>> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| {
        a.agent_id
            .cmp(&b.agent_id)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let mut linked = Vec::with_capacity(ordered.len());
    let mut previous: Option<&Event> = None;
    for event in ordered {
        let same_agent = previous.filter(|prev| prev.agent_id == event.agent_id);
        linked.push(LinkedEvent {
            event,
            previous: same_agent,
        });
        previous = Some(event);
    }
    linked
}
