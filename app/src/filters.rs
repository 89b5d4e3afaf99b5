//! In-memory narrowing of event lists.

use crate::types::{Event, EventFilters};
use chrono::NaiveDate;

/// Events matching every set criterion of `filters`, in input order.
///
/// - `search_term`: case-insensitive substring of title or description
/// - `tags`: event carries at least one of them (exact match)
/// - `date_range`: inclusive on both ends
#[must_use]
pub fn filter_events(events: &[Event], filters: &EventFilters) -> Vec<Event> {
    let needle = filters
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);

    events
        .iter()
        .filter(|event| {
            needle.as_deref().is_none_or(|needle| {
                event.title.to_lowercase().contains(needle)
                    || event.description.to_lowercase().contains(needle)
            })
        })
        .filter(|event| {
            filters.tags.is_empty() || event.tags.iter().any(|tag| filters.tags.contains(tag))
        })
        .filter(|event| {
            filters.date_range.is_none_or(|range| {
                range.start.is_none_or(|start| event.date >= start)
                    && range.end.is_none_or(|end| event.date <= end)
            })
        })
        .cloned()
        .collect()
}

/// Events on or after `today`, soonest first, at most `limit` of them.
#[must_use]
pub fn upcoming_events(events: &[Event], today: NaiveDate, limit: Option<usize>) -> Vec<Event> {
    let mut upcoming: Vec<Event> = events
        .iter()
        .filter(|event| event.date >= today)
        .cloned()
        .collect();
    upcoming.sort_by_key(|event| event.date);
    if let Some(limit) = limit {
        upcoming.truncate(limit);
    }
    upcoming
}

/// Whole days from `today` until `date`; negative once it has passed.
#[must_use]
pub fn days_remaining(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}
