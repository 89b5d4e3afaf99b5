//! In-memory persistence collaborator for fast, deterministic testing.
//!
//! Besides storing rows, [`InMemoryBackend`] counts every call per operation
//! so tests can assert on query fan-out (one batch query, not N), and lets a
//! test make any single operation fail.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Poisoned locks only happen after a panicking test

use chrono::{DateTime, Utc};
use rsvp_core::backend::{
    AttendeeRecord, AttendeeTable, BackendError, BackendFuture, EventQuery, EventRecord,
    EventTable, NewEventRecord, ProfileChanges, ProfileRecord, ProfileTable,
};
use rsvp_core::{EventId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Operations of the persistence contract, used as counter keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    /// `EventTable::select_events`
    SelectEvents,
    /// `EventTable::find_event`
    FindEvent,
    /// `EventTable::insert_event`
    InsertEvent,
    /// `AttendeeTable::find_attendee`
    FindAttendee,
    /// `AttendeeTable::attendees_for_events`
    AttendeesForEvents,
    /// `AttendeeTable::attendance_of_user`
    AttendanceOfUser,
    /// `AttendeeTable::toggle_attendee`
    ToggleAttendee,
    /// `ProfileTable::find_profile`
    FindProfile,
    /// `ProfileTable::profiles_by_ids`
    ProfilesByIds,
    /// `ProfileTable::update_profile`
    UpdateProfile,
}

#[derive(Default)]
struct Tables {
    events: Vec<EventRecord>,
    attendees: Vec<AttendeeRecord>,
    profiles: HashMap<UserId, ProfileRecord>,
}

/// HashMap/Vec backed implementation of every table trait.
///
/// Seeding helpers (`add_profile`, `seed_event`, `seed_attendee`) write rows
/// directly and are not counted as calls.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<Mutex<Tables>>,
    calls: Arc<Mutex<HashMap<BackendOp, usize>>>,
    failures: Arc<Mutex<HashMap<BackendOp, BackendError>>>,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile named `name` (email `<name>@example.com`) and return its id.
    pub fn add_profile(&self, name: &str) -> UserId {
        let id = UserId::new();
        let now = Utc::now();
        self.insert_profile(ProfileRecord {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Insert or replace a profile row.
    pub fn insert_profile(&self, profile: ProfileRecord) {
        self.tables.lock().unwrap().profiles.insert(profile.id, profile);
    }

    /// Insert an event row, assigning id and `created_at`.
    pub fn seed_event(&self, event: NewEventRecord) -> EventRecord {
        let record = materialize(event, Utc::now());
        self.tables.lock().unwrap().events.push(record.clone());
        record
    }

    /// Insert an attendance row (no-op when the pair already exists).
    pub fn seed_attendee(&self, event_id: EventId, user_id: UserId) {
        let mut tables = self.tables.lock().unwrap();
        if !tables
            .attendees
            .iter()
            .any(|a| a.event_id == event_id && a.user_id == user_id)
        {
            tables.attendees.push(attendee(event_id, user_id, Utc::now()));
        }
    }

    /// User ids attending `event_id`, in insertion order.
    #[must_use]
    pub fn attendee_ids(&self, event_id: EventId) -> Vec<UserId> {
        self.tables
            .lock()
            .unwrap()
            .attendees
            .iter()
            .filter(|a| a.event_id == event_id)
            .map(|a| a.user_id)
            .collect()
    }

    /// Number of stored event rows.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.tables.lock().unwrap().events.len()
    }

    /// Make every subsequent call of `op` fail with `error`.
    pub fn fail_on(&self, op: BackendOp, error: BackendError) {
        self.failures.lock().unwrap().insert(op, error);
    }

    /// Undo `fail_on` for `op`.
    pub fn recover(&self, op: BackendOp) {
        self.failures.lock().unwrap().remove(&op);
    }

    /// How many times `op` was called.
    #[must_use]
    pub fn calls(&self, op: BackendOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Calls across all operations.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record_call(&self, op: BackendOp) -> Result<(), BackendError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn materialize(event: NewEventRecord, created_at: DateTime<Utc>) -> EventRecord {
    EventRecord {
        id: EventId::new(),
        title: event.title,
        description: event.description,
        date: event.date,
        time: event.time,
        location: event.location,
        image_url: event.image_url,
        organizer_id: event.organizer_id,
        capacity: event.capacity,
        tags: event.tags,
        is_public: event.is_public,
        created_at,
    }
}

fn attendee(event_id: EventId, user_id: UserId, created_at: DateTime<Utc>) -> AttendeeRecord {
    AttendeeRecord {
        id: Uuid::new_v4(),
        event_id,
        user_id,
        created_at,
    }
}

impl EventTable for InMemoryBackend {
    fn select_events(&self, query: EventQuery) -> BackendFuture<'_, Vec<EventRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::SelectEvents)?;
            let mut rows: Vec<EventRecord> = self
                .tables
                .lock()
                .unwrap()
                .events
                .iter()
                .filter(|e| query.matches(e))
                .cloned()
                .collect();
            // Stable: equal dates keep insertion order
            rows.sort_by_key(|e| e.date);
            Ok(rows)
        })
    }

    fn find_event(&self, id: EventId) -> BackendFuture<'_, Option<EventRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::FindEvent)?;
            Ok(self
                .tables
                .lock()
                .unwrap()
                .events
                .iter()
                .find(|e| e.id == id)
                .cloned())
        })
    }

    fn insert_event(&self, event: NewEventRecord) -> BackendFuture<'_, EventRecord> {
        Box::pin(async move {
            self.record_call(BackendOp::InsertEvent)?;
            let mut tables = self.tables.lock().unwrap();
            if !tables.profiles.contains_key(&event.organizer_id) {
                return Err(BackendError::Constraint(
                    "insert or update on table \"events\" violates foreign key constraint \"events_organizer_id_fkey\""
                        .to_string(),
                ));
            }
            let record = materialize(event, Utc::now());
            tables.events.push(record.clone());
            Ok(record)
        })
    }
}

impl AttendeeTable for InMemoryBackend {
    fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> BackendFuture<'_, Option<AttendeeRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::FindAttendee)?;
            Ok(self
                .tables
                .lock()
                .unwrap()
                .attendees
                .iter()
                .find(|a| a.event_id == event_id && a.user_id == user_id)
                .cloned())
        })
    }

    fn attendees_for_events(&self, event_ids: Vec<EventId>) -> BackendFuture<'_, Vec<AttendeeRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::AttendeesForEvents)?;
            Ok(self
                .tables
                .lock()
                .unwrap()
                .attendees
                .iter()
                .filter(|a| event_ids.contains(&a.event_id))
                .cloned()
                .collect())
        })
    }

    fn attendance_of_user(&self, user_id: UserId) -> BackendFuture<'_, Vec<AttendeeRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::AttendanceOfUser)?;
            Ok(self
                .tables
                .lock()
                .unwrap()
                .attendees
                .iter()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn toggle_attendee(&self, event_id: EventId, user_id: UserId) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            self.record_call(BackendOp::ToggleAttendee)?;
            // Single critical section, like the single SQL statement
            let mut tables = self.tables.lock().unwrap();
            if !tables.profiles.contains_key(&user_id) {
                return Err(BackendError::Constraint(
                    "insert or update on table \"attendees\" violates foreign key constraint \"attendees_user_id_fkey\""
                        .to_string(),
                ));
            }
            let before = tables.attendees.len();
            tables
                .attendees
                .retain(|a| !(a.event_id == event_id && a.user_id == user_id));
            let removed = tables.attendees.len() != before;
            if !removed {
                tables.attendees.push(attendee(event_id, user_id, Utc::now()));
            }
            Ok(!removed)
        })
    }
}

impl ProfileTable for InMemoryBackend {
    fn find_profile(&self, id: UserId) -> BackendFuture<'_, Option<ProfileRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::FindProfile)?;
            Ok(self.tables.lock().unwrap().profiles.get(&id).cloned())
        })
    }

    fn profiles_by_ids(&self, ids: Vec<UserId>) -> BackendFuture<'_, Vec<ProfileRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::ProfilesByIds)?;
            let tables = self.tables.lock().unwrap();
            Ok(ids
                .iter()
                .filter_map(|id| tables.profiles.get(id).cloned())
                .collect())
        })
    }

    fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> BackendFuture<'_, Option<ProfileRecord>> {
        Box::pin(async move {
            self.record_call(BackendOp::UpdateProfile)?;
            let mut tables = self.tables.lock().unwrap();
            Ok(tables.profiles.get_mut(&id).map(|profile| {
                profile.name = changes.name;
                profile.email = changes.email;
                profile.avatar = changes.avatar;
                profile.updated_at = changes.updated_at;
                profile.clone()
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(organizer_id: UserId, day: u32, public: bool) -> NewEventRecord {
        NewEventRecord {
            title: format!("Meetup {day}"),
            description: "Monthly".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            time: "18:00".to_string(),
            location: "Library".to_string(),
            image_url: None,
            organizer_id,
            capacity: 20,
            tags: vec![],
            is_public: public,
        }
    }

    #[tokio::test]
    async fn select_orders_by_date_and_counts_calls() {
        let backend = InMemoryBackend::new();
        let alice = backend.add_profile("Alice");
        backend.seed_event(draft(alice, 20, true));
        backend.seed_event(draft(alice, 3, true));
        backend.seed_event(draft(alice, 9, false));

        let rows = backend.select_events(EventQuery::public()).await.unwrap();
        let days: Vec<String> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(days, vec!["2025-06-03", "2025-06-20"]);
        assert_eq!(backend.calls(BackendOp::SelectEvents), 1);
        assert_eq!(backend.total_calls(), 1);
    }

    #[tokio::test]
    async fn toggle_flips_membership() {
        let backend = InMemoryBackend::new();
        let alice = backend.add_profile("Alice");
        let bob = backend.add_profile("Bob");
        let event = backend.seed_event(draft(alice, 1, true));

        assert!(backend.toggle_attendee(event.id, bob).await.unwrap());
        assert_eq!(backend.attendee_ids(event.id), vec![bob]);
        assert!(!backend.toggle_attendee(event.id, bob).await.unwrap());
        assert!(backend.attendee_ids(event.id).is_empty());
    }

    #[tokio::test]
    async fn insert_requires_existing_organizer() {
        let backend = InMemoryBackend::new();
        let result = backend.insert_event(draft(UserId::new(), 1, true)).await;
        assert!(matches!(result, Err(BackendError::Constraint(_))));
        assert_eq!(backend.event_count(), 0);
    }

    #[tokio::test]
    async fn toggle_requires_existing_user() {
        let backend = InMemoryBackend::new();
        let alice = backend.add_profile("Alice");
        let event = backend.seed_event(draft(alice, 1, true));

        let result = backend.toggle_attendee(event.id, UserId::new()).await;

        assert!(matches!(result, Err(BackendError::Constraint(_))));
        assert!(backend.attendee_ids(event.id).is_empty());
    }

    #[tokio::test]
    async fn injected_failure_is_returned_until_recovered() {
        let backend = InMemoryBackend::new();
        backend.fail_on(
            BackendOp::ProfilesByIds,
            BackendError::Connection("pool timed out".to_string()),
        );
        assert!(backend.profiles_by_ids(vec![UserId::new()]).await.is_err());

        backend.recover(BackendOp::ProfilesByIds);
        assert!(backend.profiles_by_ids(vec![UserId::new()]).await.unwrap().is_empty());
        assert_eq!(backend.calls(BackendOp::ProfilesByIds), 2);
    }
}
