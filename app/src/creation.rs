//! Event Creation Flow.
//!
//! `validate → organizer lookup → insert → denormalize`. Each stage fails
//! with its own [`RsvpError`] variant and nothing is returned on failure.

use crate::error::RsvpError;
use crate::types::{Event, EventDraft, User};
use rsvp_core::Backend;
use rsvp_core::backend::NewEventRecord;
use std::sync::Arc;

/// Check a draft and normalize it into insertable column values.
///
/// Text fields are trimmed and must be non-empty; `capacity` must be
/// positive. Tags are trimmed and blank ones dropped.
///
/// # Errors
///
/// Returns [`RsvpError::Validation`] naming the first offending field.
pub fn validate_draft(draft: &EventDraft) -> Result<NewEventRecord, RsvpError> {
    let title = required("title", "Title", &draft.title)?;
    let description = required("description", "Description", &draft.description)?;
    let date = draft
        .date
        .ok_or_else(|| RsvpError::validation("date", "Date is required"))?;
    let time = required("time", "Time", &draft.time)?;
    let location = required("location", "Location", &draft.location)?;

    if draft.capacity == 0 {
        return Err(RsvpError::validation(
            "capacity",
            "Capacity must be at least 1",
        ));
    }

    let image_url = draft
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    let tags = draft
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect();

    Ok(NewEventRecord {
        title,
        description,
        date,
        time,
        location,
        image_url,
        organizer_id: draft.organizer_id,
        capacity: draft.capacity,
        tags,
        is_public: draft.is_public,
    })
}

fn required(field: &'static str, label: &str, value: &str) -> Result<String, RsvpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RsvpError::validation(field, format!("{label} is required")));
    }
    Ok(trimmed.to_string())
}

/// Write side for new events.
#[derive(Clone)]
pub struct EventCreator {
    backend: Arc<dyn Backend>,
}

impl EventCreator {
    /// Create the flow over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Validate, persist and return the new event with its organizer and no
    /// attendees.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::Validation`] before any backend call
    /// - [`RsvpError::OrganizerNotFound`] if the organizer has no profile
    /// - [`RsvpError::Persistence`] if the lookup or insert fails
    #[tracing::instrument(skip(self, draft), fields(organizer_id = %draft.organizer_id))]
    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, RsvpError> {
        let record = validate_draft(&draft).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected event draft");
        })?;

        let organizer = self
            .backend
            .find_profile(draft.organizer_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load organizer profile"))?
            .ok_or_else(|| {
                tracing::warn!("Organizer has no profile row");
                RsvpError::OrganizerNotFound(draft.organizer_id)
            })?;

        let row = self
            .backend
            .insert_event(record)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to insert event"))?;

        metrics::counter!("rsvp_events_created_total").increment(1);
        tracing::info!(event_id = %row.id, "Event created");

        Ok(Event::from_record(row, Vec::new(), Some(User::from(organizer))))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::NaiveDate;
    use rsvp_core::BackendError;
    use rsvp_testing::{BackendOp, InMemoryBackend};

    fn draft(organizer_id: UserId) -> EventDraft {
        EventDraft {
            title: "T".to_string(),
            description: "D".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1),
            time: "10:00".to_string(),
            location: "L".to_string(),
            image_url: None,
            organizer_id,
            capacity: 10,
            tags: vec!["x".to_string()],
            is_public: true,
        }
    }

    fn setup() -> (Arc<InMemoryBackend>, EventCreator) {
        let backend = Arc::new(InMemoryBackend::new());
        let creator = EventCreator::new(backend.clone());
        (backend, creator)
    }

    #[tokio::test]
    async fn creation_round_trip() {
        let (backend, creator) = setup();
        let organizer = backend.add_profile("Alice");

        let event = creator.create_event(draft(organizer)).await.unwrap();

        assert!(!event.id.to_string().is_empty());
        assert!(event.attendees.is_empty());
        assert_eq!(event.organizer.as_ref().map(|u| u.id), Some(organizer));
        assert_eq!(event.title, "T");
        assert_eq!(event.tags, vec!["x".to_string()]);
        assert_eq!(backend.event_count(), 1);
    }

    #[tokio::test]
    async fn missing_title_never_reaches_backend() {
        let (backend, creator) = setup();
        let organizer = backend.add_profile("Alice");
        let mut bad = draft(organizer);
        bad.title = String::new();

        let result = creator.create_event(bad).await;

        assert!(matches!(
            result,
            Err(RsvpError::Validation { field: "title", .. })
        ));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_organizer_is_a_reference_error() {
        let (backend, creator) = setup();
        let stranger = UserId::new();

        let result = creator.create_event(draft(stranger)).await;

        assert_eq!(result, Err(RsvpError::OrganizerNotFound(stranger)));
        assert_eq!(backend.calls(BackendOp::InsertEvent), 0);
        assert_eq!(backend.event_count(), 0);
    }

    #[tokio::test]
    async fn insert_failure_is_surfaced() {
        let (backend, creator) = setup();
        let organizer = backend.add_profile("Alice");
        let failure = BackendError::Database("disk full".to_string());
        backend.fail_on(BackendOp::InsertEvent, failure.clone());

        let result = creator.create_event(draft(organizer)).await;

        assert_eq!(result, Err(RsvpError::Persistence(failure)));
    }

    #[test]
    fn each_required_field_is_checked() {
        let organizer = UserId::new();
        let cases: [(&str, fn(&mut EventDraft)); 6] = [
            ("title", |d| d.title = "   ".to_string()),
            ("description", |d| d.description.clear()),
            ("date", |d| d.date = None),
            ("time", |d| d.time.clear()),
            ("location", |d| d.location = "\t".to_string()),
            ("capacity", |d| d.capacity = 0),
        ];

        for (expected, break_it) in cases {
            let mut bad = draft(organizer);
            break_it(&mut bad);
            match validate_draft(&bad) {
                Err(RsvpError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn validation_normalizes_fields() {
        let mut input = draft(UserId::new());
        input.title = "  Board games  ".to_string();
        input.image_url = Some("  ".to_string());
        input.tags = vec![" Games ".to_string(), "   ".to_string(), "Social".to_string()];

        let record = validate_draft(&input).unwrap();

        assert_eq!(record.title, "Board games");
        assert_eq!(record.image_url, None);
        assert_eq!(record.tags, vec!["Games".to_string(), "Social".to_string()]);
    }
}
