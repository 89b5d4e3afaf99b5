//! Event Query Facade.
//!
//! Every read produces fully denormalized [`Event`]s in three stages:
//!
//! 1. Fetch the primary `events` rows for the predicate (ordered by date)
//! 2. Batch-fetch the organizer profiles of the distinct organizer ids and
//!    the attendance rows of the fetched event ids, one query each
//! 3. Join both into every row
//!
//! An empty primary result short-circuits: no batch query is issued.
//! A failing primary fetch is an error; a failing batch only degrades the
//! result (organizer left absent, attendee list left empty).

use crate::error::RsvpError;
use crate::types::{Event, EventId, User, UserId};
use rsvp_core::Backend;
use rsvp_core::backend::{AttendeeRecord, EventQuery, EventRecord, ProfileRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Read side of the service.
#[derive(Clone)]
pub struct EventQueries {
    backend: Arc<dyn Backend>,
}

impl EventQueries {
    /// Create the facade over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// All public events, by date ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the events query fails.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_public_events(&self) -> Result<Vec<Event>, RsvpError> {
        let rows = self.select(EventQuery::public(), "public").await?;
        Ok(self.denormalize(rows).await)
    }

    /// Events organized by `user_id`, by date ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the events query fails.
    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn fetch_user_events(&self, user_id: UserId) -> Result<Vec<Event>, RsvpError> {
        let rows = self.select(EventQuery::organized_by(user_id), "organizing").await?;
        Ok(self.denormalize(rows).await)
    }

    /// Events `user_id` attends but does not organize, by date ascending.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the attendance lookup or the
    /// events query fails.
    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn fetch_attending_events(&self, user_id: UserId) -> Result<Vec<Event>, RsvpError> {
        let attendance = self
            .backend
            .attendance_of_user(user_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load attendance"))?;

        if attendance.is_empty() {
            metrics::counter!("rsvp_event_queries_total", "shape" => "attending").increment(1);
            return Ok(Vec::new());
        }

        let ids = attendance.into_iter().map(|row| row.event_id).collect();
        let query = EventQuery::default().with_ids(ids).not_organized_by(user_id);
        let rows = self.select(query, "attending").await?;
        Ok(self.denormalize(rows).await)
    }

    /// One event with organizer and attendees joined; `None` when it does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Persistence`] if the event lookup fails.
    #[tracing::instrument(skip(self), fields(%event_id))]
    pub async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, RsvpError> {
        metrics::counter!("rsvp_event_queries_total", "shape" => "single").increment(1);

        let Some(row) = self
            .backend
            .find_event(event_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load event"))?
        else {
            return Ok(None);
        };

        Ok(self.denormalize(vec![row]).await.pop())
    }

    async fn select(
        &self,
        query: EventQuery,
        shape: &'static str,
    ) -> Result<Vec<EventRecord>, RsvpError> {
        metrics::counter!("rsvp_event_queries_total", "shape" => shape).increment(1);

        let rows = self
            .backend
            .select_events(query)
            .await
            .inspect_err(|e| tracing::error!(shape, error = %e, "Failed to fetch events"))?;

        tracing::debug!(shape, rows = rows.len(), "Fetched events");
        Ok(rows)
    }

    async fn denormalize(&self, rows: Vec<EventRecord>) -> Vec<Event> {
        if rows.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let organizer_ids: Vec<UserId> = rows
            .iter()
            .map(|row| row.organizer_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let event_ids: Vec<EventId> = rows.iter().map(|row| row.id).collect();

        let (profiles, attendance) = tokio::join!(
            self.backend.profiles_by_ids(organizer_ids),
            self.backend.attendees_for_events(event_ids),
        );

        let organizers = index_organizers(profiles.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Organizer lookup failed, returning events without organizers");
            Vec::new()
        }));
        let mut attendees = group_attendees(attendance.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Attendee lookup failed, returning events without attendees");
            Vec::new()
        }));

        rows.into_iter()
            .map(|row| {
                let organizer = organizers.get(&row.organizer_id).cloned();
                let attending = attendees.remove(&row.id).unwrap_or_default();
                Event::from_record(row, attending, organizer)
            })
            .collect()
    }
}

fn index_organizers(profiles: Vec<ProfileRecord>) -> HashMap<UserId, User> {
    profiles
        .into_iter()
        .map(|profile| (profile.id, User::from(profile)))
        .collect()
}

fn group_attendees(rows: Vec<AttendeeRecord>) -> HashMap<EventId, Vec<UserId>> {
    let mut grouped: HashMap<EventId, Vec<UserId>> = HashMap::new();
    for row in rows {
        let ids = grouped.entry(row.event_id).or_default();
        if !ids.contains(&row.user_id) {
            ids.push(row.user_id);
        }
    }
    grouped
}
