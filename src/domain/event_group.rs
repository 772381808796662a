//! Correlation grouping for the activity feed.
//!
//! Events sharing a `correlation_id` describe one logical user operation
//! (started, then completed or failed, with nested swaps and pool moves in
//! between). [`group_events`] partitions a page of records into such
//! groups.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::EventRecord;

/// All events of one logical operation, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGroup {
    /// Shared correlation key.
    pub correlation_id: String,
    /// Highest-id (newest) event of the group; equals `events[0]`.
    pub first_event: EventRecord,
    /// Every event of the group, sorted by id descending.
    pub events: Vec<EventRecord>,
    /// `true` if any event in the group has a failed outcome.
    pub has_failed_event: bool,
    /// Title of the newest event, e.g. `"Strategy Deposit Completed"`.
    pub label: String,
    /// Summary line of the newest event.
    pub summary: String,
}

/// Groups events by correlation id.
///
/// Every input event lands in exactly one group. Groups are ordered by
/// their newest event id descending; ties go to the lexically smaller
/// correlation id. Duplicate ids within a group are kept as-is.
#[must_use]
pub fn group_events(records: Vec<EventRecord>) -> Vec<EventGroup> {
    let mut buckets: HashMap<String, Vec<EventRecord>> = HashMap::new();
    for record in records {
        buckets
            .entry(record.correlation_id.clone())
            .or_default()
            .push(record);
    }

    let mut groups: Vec<EventGroup> = buckets
        .into_iter()
        .filter_map(|(correlation_id, mut events)| {
            events.sort_by(|a, b| b.id.cmp(&a.id));
            let first_event = events.first()?.clone();
            Some(EventGroup {
                has_failed_event: events.iter().any(|e| e.kind.is_failure()),
                label: first_event.kind.title(),
                summary: first_event.summary(),
                correlation_id,
                first_event,
                events,
            })
        })
        .collect();

    groups.sort_by(|a, b| {
        b.first_event
            .id
            .cmp(&a.first_event.id)
            .then_with(|| a.correlation_id.cmp(&b.correlation_id))
    });
    groups
}
