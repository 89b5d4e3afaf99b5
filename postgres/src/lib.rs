//! `PostgreSQL` backend for the RSVP service.
//!
//! This crate implements the persistence contract from `rsvp-core`
//! (`EventTable`, `AttendeeTable`, `ProfileTable`) on top of sqlx and
//! ships the schema as embedded migrations:
//!
//! - `profiles` - one row per authenticated user
//! - `events` - organizer-owned events, `organizer_id` references `profiles`
//! - `attendees` - the `(event_id, user_id)` relation, unique per pair
//!
//! # Example
//!
//! ```ignore
//! use rsvp_postgres::PostgresBackend;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = PostgresBackend::connect("postgres://localhost/rsvp", 10, 1, 30).await?;
//!     backend.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, NaiveDate, Utc};
use rsvp_core::backend::{
    AttendeeRecord, AttendeeTable, BackendError, BackendFuture, EventQuery, EventRecord,
    EventTable, NewEventRecord, ProfileChanges, ProfileRecord, ProfileTable,
};
use rsvp_core::{EventId, UserId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, title, description, date, time, location, image_url, \
                             organizer_id, capacity, tags, is_public, created_at";

type EventRow = (
    Uuid,
    String,
    String,
    NaiveDate,
    String,
    String,
    Option<String>,
    Uuid,
    i32,
    Vec<String>,
    bool,
    DateTime<Utc>,
);

type AttendeeRow = (Uuid, Uuid, Uuid, DateTime<Utc>);

type ProfileRow = (
    Uuid,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// `PostgreSQL`-backed implementation of the persistence contract.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] if the database is unreachable.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| BackendError::Connection(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, min_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Create or upgrade the `profiles`, `events` and `attendees` tables.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), BackendError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| BackendError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx failure onto the collaborator error taxonomy, keeping the
/// driver message verbatim.
fn backend_error(operation: &'static str, error: sqlx::Error) -> BackendError {
    metrics::counter!("rsvp_backend_errors_total", "operation" => operation).increment(1);
    tracing::error!(operation, error = %error, "PostgreSQL operation failed");

    let message = error.to_string();
    match &error {
        sqlx::Error::Database(db)
            if db.is_foreign_key_violation() || db.is_unique_violation() || db.is_check_violation() =>
        {
            BackendError::Constraint(db.message().to_string())
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            BackendError::Connection(message)
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            BackendError::Decode(message)
        },
        _ => BackendError::Database(message),
    }
}

fn event_from_row(row: EventRow) -> Result<EventRecord, BackendError> {
    let (
        id,
        title,
        description,
        date,
        time,
        location,
        image_url,
        organizer_id,
        capacity,
        tags,
        is_public,
        created_at,
    ) = row;

    let capacity = u32::try_from(capacity)
        .map_err(|_| BackendError::Decode(format!("Negative capacity {capacity} on event {id}")))?;

    Ok(EventRecord {
        id: EventId::from_uuid(id),
        title,
        description,
        date,
        time,
        location,
        image_url,
        organizer_id: UserId::from_uuid(organizer_id),
        capacity,
        tags,
        is_public,
        created_at,
    })
}

fn attendee_from_row((id, event_id, user_id, created_at): AttendeeRow) -> AttendeeRecord {
    AttendeeRecord {
        id,
        event_id: EventId::from_uuid(event_id),
        user_id: UserId::from_uuid(user_id),
        created_at,
    }
}

fn profile_from_row((id, name, email, avatar, created_at, updated_at): ProfileRow) -> ProfileRecord {
    ProfileRecord {
        id: UserId::from_uuid(id),
        name,
        email,
        avatar,
        created_at,
        updated_at,
    }
}

impl EventTable for PostgresBackend {
    fn select_events(&self, query: EventQuery) -> BackendFuture<'_, Vec<EventRecord>> {
        Box::pin(async move {
            // Unset predicates are bound as NULL and short-circuit to true
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE ($1::boolean IS NULL OR is_public = $1)
                   AND ($2::uuid IS NULL OR organizer_id = $2)
                   AND ($3::uuid[] IS NULL OR id = ANY($3))
                   AND ($4::uuid IS NULL OR organizer_id <> $4)
                 ORDER BY date ASC, created_at ASC"
            );

            let ids: Option<Vec<Uuid>> = query
                .ids
                .map(|ids| ids.iter().map(EventId::as_uuid).collect());

            let rows: Vec<EventRow> = sqlx::query_as(&sql)
                .bind(query.is_public)
                .bind(query.organizer_id.map(|id| id.as_uuid()))
                .bind(ids)
                .bind(query.exclude_organizer.map(|id| id.as_uuid()))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| backend_error("select_events", e))?;

            tracing::debug!(rows = rows.len(), "Selected events");
            rows.into_iter().map(event_from_row).collect()
        })
    }

    fn find_event(&self, id: EventId) -> BackendFuture<'_, Option<EventRecord>> {
        Box::pin(async move {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");

            let row: Option<EventRow> = sqlx::query_as(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| backend_error("find_event", e))?;

            row.map(event_from_row).transpose()
        })
    }

    fn insert_event(&self, event: NewEventRecord) -> BackendFuture<'_, EventRecord> {
        Box::pin(async move {
            let capacity = i32::try_from(event.capacity)
                .map_err(|_| BackendError::Constraint(format!("Capacity {} out of range", event.capacity)))?;

            let sql = format!(
                "INSERT INTO events (
                    title, description, date, time, location, image_url,
                    organizer_id, capacity, tags, is_public
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 RETURNING {EVENT_COLUMNS}"
            );

            let row: EventRow = sqlx::query_as(&sql)
                .bind(&event.title)
                .bind(&event.description)
                .bind(event.date)
                .bind(&event.time)
                .bind(&event.location)
                .bind(&event.image_url)
                .bind(event.organizer_id.as_uuid())
                .bind(capacity)
                .bind(&event.tags)
                .bind(event.is_public)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| backend_error("insert_event", e))?;

            let record = event_from_row(row)?;
            tracing::info!(event_id = %record.id, organizer_id = %record.organizer_id, "Inserted event");
            Ok(record)
        })
    }
}

impl AttendeeTable for PostgresBackend {
    fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> BackendFuture<'_, Option<AttendeeRecord>> {
        Box::pin(async move {
            let row: Option<AttendeeRow> = sqlx::query_as(
                r"
                SELECT id, event_id, user_id, created_at
                FROM attendees
                WHERE event_id = $1 AND user_id = $2
                ",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error("find_attendee", e))?;

            Ok(row.map(attendee_from_row))
        })
    }

    fn attendees_for_events(&self, event_ids: Vec<EventId>) -> BackendFuture<'_, Vec<AttendeeRecord>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = event_ids.iter().map(EventId::as_uuid).collect();

            let rows: Vec<AttendeeRow> = sqlx::query_as(
                r"
                SELECT id, event_id, user_id, created_at
                FROM attendees
                WHERE event_id = ANY($1)
                ORDER BY created_at ASC
                ",
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend_error("attendees_for_events", e))?;

            Ok(rows.into_iter().map(attendee_from_row).collect())
        })
    }

    fn attendance_of_user(&self, user_id: UserId) -> BackendFuture<'_, Vec<AttendeeRecord>> {
        Box::pin(async move {
            let rows: Vec<AttendeeRow> = sqlx::query_as(
                r"
                SELECT id, event_id, user_id, created_at
                FROM attendees
                WHERE user_id = $1
                ",
            )
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend_error("attendance_of_user", e))?;

            Ok(rows.into_iter().map(attendee_from_row).collect())
        })
    }

    fn toggle_attendee(&self, event_id: EventId, user_id: UserId) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            // One statement: delete the pair if present, otherwise insert it.
            // The unique (event_id, user_id) constraint absorbs a racing insert.
            let (now_attending,): (bool,) = sqlx::query_as(
                r"
                WITH removed AS (
                    DELETE FROM attendees
                    WHERE event_id = $1 AND user_id = $2
                    RETURNING id
                ), inserted AS (
                    INSERT INTO attendees (event_id, user_id)
                    SELECT $1, $2
                    WHERE NOT EXISTS (SELECT 1 FROM removed)
                    ON CONFLICT (event_id, user_id) DO NOTHING
                    RETURNING id
                )
                SELECT NOT EXISTS (SELECT 1 FROM removed)
                ",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| backend_error("toggle_attendee", e))?;

            tracing::debug!(%event_id, %user_id, now_attending, "Toggled attendance");
            Ok(now_attending)
        })
    }
}

impl ProfileTable for PostgresBackend {
    fn find_profile(&self, id: UserId) -> BackendFuture<'_, Option<ProfileRecord>> {
        Box::pin(async move {
            let row: Option<ProfileRow> = sqlx::query_as(
                r"
                SELECT id, name, email, avatar, created_at, updated_at
                FROM profiles
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error("find_profile", e))?;

            Ok(row.map(profile_from_row))
        })
    }

    fn profiles_by_ids(&self, ids: Vec<UserId>) -> BackendFuture<'_, Vec<ProfileRecord>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = ids.iter().map(UserId::as_uuid).collect();

            let rows: Vec<ProfileRow> = sqlx::query_as(
                r"
                SELECT id, name, email, avatar, created_at, updated_at
                FROM profiles
                WHERE id = ANY($1)
                ",
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend_error("profiles_by_ids", e))?;

            Ok(rows.into_iter().map(profile_from_row).collect())
        })
    }

    fn update_profile(
        &self,
        id: UserId,
        changes: ProfileChanges,
    ) -> BackendFuture<'_, Option<ProfileRecord>> {
        Box::pin(async move {
            let row: Option<ProfileRow> = sqlx::query_as(
                r"
                UPDATE profiles
                SET name = $2, email = $3, avatar = $4, updated_at = $5
                WHERE id = $1
                RETURNING id, name, email, avatar, created_at, updated_at
                ",
            )
            .bind(id.as_uuid())
            .bind(&changes.name)
            .bind(&changes.email)
            .bind(&changes.avatar)
            .bind(changes.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend_error("update_profile", e))?;

            Ok(row.map(profile_from_row))
        })
    }
}
