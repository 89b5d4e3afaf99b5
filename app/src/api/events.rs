//! Event API endpoints.
//!
//! - GET /api/events - Public feed, optionally filtered
//! - GET /api/events/:id - One event with organizer and attendees (private: members only)
//! - POST /api/events - Create an event (requires auth, caller is organizer)
//! - POST /api/events/:id/attendance - Toggle the caller's RSVP (requires auth)

use crate::attendance::rsvp_notice;
use crate::auth::SessionUser;
use crate::filters::{filter_events, upcoming_events};
use crate::server::state::AppState;
use crate::types::{DateRange, Event, EventDraft, EventFilters, EventId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rsvp_web::{AppError, WebResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the public feed.
#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    /// Comma-separated tags; any match
    pub tag: Option<String>,
    /// First day included
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
    /// Only events from today on
    #[serde(default)]
    pub upcoming: bool,
    /// Maximum number of events
    pub limit: Option<usize>,
}

impl ListEventsQuery {
    fn filters(&self) -> EventFilters {
        let tags = self
            .tag
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let date_range = (self.from.is_some() || self.to.is_some()).then_some(DateRange {
            start: self.from,
            end: self.to,
        });

        EventFilters {
            search_term: self.search.clone(),
            tags,
            date_range,
        }
    }
}

/// Request to create an event. The organizer is always the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Calendar day
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Start time
    #[serde(default)]
    pub time: String,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Advertised capacity
    #[serde(default)]
    pub capacity: u32,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Listed in the public feed
    #[serde(default = "default_public")]
    pub is_public: bool,
}

const fn default_public() -> bool {
    true
}

/// Outcome of an RSVP toggle.
#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    /// Membership after the toggle
    pub attending: bool,
    /// "You're going!" or "RSVP cancelled"
    pub message: String,
    /// Refreshed event, absent if it could not be re-read
    pub event: Option<Event>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List public events.
///
/// ```bash
/// curl "http://localhost:8080/api/events?search=jazz&tag=Music,Outdoors&from=2025-06-01"
/// ```
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> WebResult<Json<Vec<Event>>> {
    let events = state.services.queries.fetch_public_events().await?;

    let mut events = filter_events(&events, &query.filters());
    if query.upcoming {
        events = upcoming_events(&events, state.services.clock.today(), query.limit);
    } else if let Some(limit) = query.limit {
        events.truncate(limit);
    }

    Ok(Json(events))
}

/// Get one event.
///
/// Public events are readable without a token. A private event is only
/// shown to its organizer and attendees; anyone else gets a 404, the same
/// as for an unknown id.
pub async fn get_event(
    user: Option<SessionUser>,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<Event>> {
    let viewer = user.map(|user| user.user_id());

    state
        .services
        .queries
        .get_event(event_id)
        .await?
        .filter(|event| {
            event.is_public
                || viewer.is_some_and(|id| event.is_organized_by(id) || event.is_attended_by(id))
        })
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", event_id))
}

/// Create an event organized by the caller.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Authorization: Bearer <access_token>" \
///   -H "Content-Type: application/json" \
///   -d '{"title":"Tech Conference 2025","description":"Keynotes","date":"2025-06-15",
///        "time":"09:00 AM","location":"Convention Center","capacity":500,"tags":["Technology"]}'
/// ```
pub async fn create_event(
    user: SessionUser,
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> WebResult<(StatusCode, Json<Event>)> {
    let draft = EventDraft {
        title: request.title,
        description: request.description,
        date: request.date,
        time: request.time,
        location: request.location,
        image_url: request.image_url,
        organizer_id: user.user_id(),
        capacity: request.capacity,
        tags: request.tags,
        is_public: request.is_public,
    };

    let event = state.services.creator.create_event(draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Toggle the caller's RSVP.
pub async fn toggle_attendance(
    user: SessionUser,
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> WebResult<Json<AttendanceResponse>> {
    let attending = state
        .services
        .attendance
        .toggle_attendance(event_id, user.user_id())
        .await?;

    let event = match state.services.queries.get_event(event_id).await {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(%event_id, error = %e, "Toggled attendance but could not re-read event");
            None
        },
    };

    Ok(Json(AttendanceResponse {
        attending,
        message: rsvp_notice(attending).to_string(),
        event,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_list_is_split_and_trimmed() {
        let query = ListEventsQuery {
            tag: Some("Music, Outdoors,,".to_string()),
            ..ListEventsQuery::default()
        };

        let filters = query.filters();

        assert_eq!(filters.tags, vec!["Music".to_string(), "Outdoors".to_string()]);
        assert!(filters.date_range.is_none());
    }

    #[test]
    fn one_sided_date_range() {
        let from = NaiveDate::from_ymd_opt(2025, 6, 1);
        let query = ListEventsQuery {
            from,
            ..ListEventsQuery::default()
        };

        let range = query.filters().date_range;

        assert_eq!(range, Some(DateRange { start: from, end: None }));
    }
}
