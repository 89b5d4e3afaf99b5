//! Error types for the RSVP service.

use rsvp_core::BackendError;
use rsvp_core::{EventId, UserId};
use rsvp_web::AppError;
use thiserror::Error;

/// Failures of the attendance, query, creation and profile operations.
///
/// An empty query result is not an error: queries return an empty list or
/// `None` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RsvpError {
    /// Input rejected before reaching the backend.
    #[error("{message}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// User-facing explanation
        message: String,
    },

    /// The user toggling an RSVP has no profile row.
    #[error("Profile {0} not found. Please sign out and sign in again.")]
    AttendeeNotFound(UserId),

    /// The organizer of a new event has no profile row.
    ///
    /// Usually a profile provisioning race right after sign-up.
    #[error("Organizer profile {0} not found. Please sign out and sign in again.")]
    OrganizerNotFound(UserId),

    /// The event does not exist.
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// The user has no profile row.
    #[error("Profile {0} not found")]
    ProfileNotFound(UserId),

    /// Organizers cannot RSVP to their own events.
    #[error("Organizers cannot RSVP to their own event")]
    OrganizerCannotRsvp,

    /// The backend rejected or failed a read or write. The message is kept verbatim.
    #[error(transparent)]
    Persistence(#[from] BackendError),
}

impl RsvpError {
    /// Validation failure for `field`.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<RsvpError> for AppError {
    fn from(err: RsvpError) -> Self {
        match &err {
            RsvpError::Validation { .. } => Self::validation(err.to_string()),
            RsvpError::OrganizerNotFound(_) => {
                Self::conflict(err.to_string(), "ORGANIZER_NOT_FOUND")
            },
            RsvpError::AttendeeNotFound(_) => Self::conflict(err.to_string(), "ATTENDEE_NOT_FOUND"),
            RsvpError::OrganizerCannotRsvp => Self::conflict(err.to_string(), "SELF_RSVP"),
            RsvpError::EventNotFound(id) => Self::not_found("Event", id),
            RsvpError::ProfileNotFound(id) => Self::not_found("Profile", id),
            RsvpError::Persistence(_) => {
                Self::internal("The event store is unavailable, please try again").with_source(err)
            },
        }
    }
}
