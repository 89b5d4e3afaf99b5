//! The persistence collaborator contract.
//!
//! The service never owns its data: events, attendance rows and profiles live
//! in a remote relational store. This module describes the three logical
//! tables as traits plus the row shapes they exchange.
//!
//! # Design
//!
//! - `events`: filtered select (`eq`, `in`, `neq`), always ordered by date,
//!   point lookup and insert-returning
//! - `attendees`: the authoritative `(event_id, user_id)` relation with a
//!   uniqueness constraint on the pair
//! - `profiles`: point and batch lookup by user id, profile update
//!
//! # Implementations
//!
//! - `PostgresBackend` (in `rsvp-postgres`): Production implementation
//! - `InMemoryBackend` (in `rsvp-testing`): Fast, deterministic testing
//!
//! # Dyn Compatibility
//!
//! Methods return [`BackendFuture`] instead of using `async fn` so the traits
//! can be used as `Arc<dyn Backend>` and captured by effects.

use crate::id::{EventId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Boxed future returned by every backend operation.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Errors reported by the persistence collaborator.
///
/// Messages are preserved verbatim so callers can decide how much to show.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Query or statement failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Could not obtain a connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A constraint (foreign key, uniqueness, check) rejected a write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A row could not be mapped into its record type.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A row of the `events` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Assigned by the store on insert
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// Calendar day of the event
    pub date: NaiveDate,
    /// Free-form start time as entered by the organizer
    pub time: String,
    /// Where the event takes place
    pub location: String,
    /// Optional cover image
    pub image_url: Option<String>,
    /// Owning user
    pub organizer_id: UserId,
    /// Advertised capacity (informational)
    pub capacity: u32,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Listed in the public feed
    pub is_public: bool,
    /// Assigned by the store on insert
    pub created_at: DateTime<Utc>,
}

/// Column values for inserting into `events`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEventRecord {
    /// Event title
    pub title: String,
    /// Event description
    pub description: String,
    /// Calendar day of the event
    pub date: NaiveDate,
    /// Free-form start time
    pub time: String,
    /// Where the event takes place
    pub location: String,
    /// Optional cover image
    pub image_url: Option<String>,
    /// Owning user
    pub organizer_id: UserId,
    /// Advertised capacity
    pub capacity: u32,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Listed in the public feed
    pub is_public: bool,
}

/// A row of the `attendees` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeRecord {
    /// Row id
    pub id: Uuid,
    /// Attended event
    pub event_id: EventId,
    /// Attending user
    pub user_id: UserId,
    /// When the RSVP was made
    pub created_at: DateTime<Utc>,
}

/// A row of the `profiles` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Same id as the auth user
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL
    pub avatar: Option<String>,
    /// Provisioning time
    pub created_at: DateTime<Utc>,
    /// Last profile update
    pub updated_at: DateTime<Utc>,
}

/// New column values for a profile update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileChanges {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL (`None` clears it)
    pub avatar: Option<String>,
    /// Timestamp written to `updated_at`
    pub updated_at: DateTime<Utc>,
}

/// Filter for selecting rows from `events`.
///
/// All set predicates are combined with AND. Results are ordered by `date`
/// ascending, ties broken by `created_at`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// `is_public = ?`
    pub is_public: Option<bool>,
    /// `organizer_id = ?`
    pub organizer_id: Option<UserId>,
    /// `id IN (?)`
    pub ids: Option<Vec<EventId>>,
    /// `organizer_id <> ?`
    pub exclude_organizer: Option<UserId>,
}

impl EventQuery {
    /// Events listed in the public feed.
    #[must_use]
    pub fn public() -> Self {
        Self {
            is_public: Some(true),
            ..Self::default()
        }
    }

    /// Events owned by `user_id`.
    #[must_use]
    pub fn organized_by(user_id: UserId) -> Self {
        Self {
            organizer_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Restrict to the given ids.
    #[must_use]
    pub fn with_ids(mut self, ids: Vec<EventId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Drop events owned by `user_id`.
    #[must_use]
    pub const fn not_organized_by(mut self, user_id: UserId) -> Self {
        self.exclude_organizer = Some(user_id);
        self
    }

    /// Whether `record` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, record: &EventRecord) -> bool {
        self.is_public.is_none_or(|public| record.is_public == public)
            && self.organizer_id.is_none_or(|id| record.organizer_id == id)
            && self.ids.as_ref().is_none_or(|ids| ids.contains(&record.id))
            && self.exclude_organizer.is_none_or(|id| record.organizer_id != id)
    }
}

/// The `events` table.
pub trait EventTable: Send + Sync {
    /// Select events matching `query`, ordered by date ascending.
    fn select_events(&self, query: EventQuery) -> BackendFuture<'_, Vec<EventRecord>>;

    /// Point lookup; `Ok(None)` when no row exists.
    fn find_event(&self, id: EventId) -> BackendFuture<'_, Option<EventRecord>>;

    /// Insert a row and return it with its assigned id and `created_at`.
    fn insert_event(&self, event: NewEventRecord) -> BackendFuture<'_, EventRecord>;
}

/// The `attendees` relation.
pub trait AttendeeTable: Send + Sync {
    /// "At most one" lookup of the `(event_id, user_id)` pair.
    fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> BackendFuture<'_, Option<AttendeeRecord>>;

    /// All attendance rows for a set of events (single batched query).
    fn attendees_for_events(&self, event_ids: Vec<EventId>) -> BackendFuture<'_, Vec<AttendeeRecord>>;

    /// All attendance rows of one user.
    fn attendance_of_user(&self, user_id: UserId) -> BackendFuture<'_, Vec<AttendeeRecord>>;

    /// Atomically flip membership of the pair.
    ///
    /// Removes the row when present, inserts it otherwise, as a single
    /// operation keyed on the pair's uniqueness constraint. Returns `true`
    /// when the user is attending afterwards.
    fn toggle_attendee(&self, event_id: EventId, user_id: UserId) -> BackendFuture<'_, bool>;
}

/// The `profiles` table.
pub trait ProfileTable: Send + Sync {
    /// Point lookup; `Ok(None)` when no row exists.
    fn find_profile(&self, id: UserId) -> BackendFuture<'_, Option<ProfileRecord>>;

    /// Batch lookup (single query). Unknown ids are simply absent.
    fn profiles_by_ids(&self, ids: Vec<UserId>) -> BackendFuture<'_, Vec<ProfileRecord>>;

    /// Overwrite the editable columns; `Ok(None)` when no row exists.
    fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> BackendFuture<'_, Option<ProfileRecord>>;
}

/// The full persistence collaborator.
pub trait Backend: EventTable + AttendeeTable + ProfileTable {}

impl<T> Backend for T where T: EventTable + AttendeeTable + ProfileTable + ?Sized {}
