//! Attendance reconciliation.
//!
//! Toggling an RSVP flips membership of the `(event, user)` pair in the
//! attendance relation. The backend does this atomically, keyed on the
//! pair's uniqueness constraint, and reports the resulting membership.
//! Cached [`Event`] copies are then reconciled with [`apply_toggle`];
//! they are never mutated without a corresponding write to the relation.
//!
//! Capacity is advertised but not enforced: an RSVP past `capacity`
//! succeeds. Organizers cannot RSVP to their own events.

use crate::error::RsvpError;
use crate::types::{Event, EventId, UserId};
use rsvp_core::Backend;
use std::sync::Arc;

/// Caller-facing copy for a toggle result.
#[must_use]
pub const fn rsvp_notice(now_attending: bool) -> &'static str {
    if now_attending {
        "You're going!"
    } else {
        "RSVP cancelled"
    }
}

/// Reconcile a cached event with an authoritative toggle result.
///
/// Adds `user_id` when `now_attending` and it is absent, removes it
/// otherwise. Never introduces duplicates.
#[must_use]
pub fn apply_toggle(event: &Event, user_id: UserId, now_attending: bool) -> Event {
    let mut updated = event.clone();
    if now_attending {
        if !updated.attendees.contains(&user_id) {
            updated.attendees.push(user_id);
        }
    } else {
        updated.attendees.retain(|id| *id != user_id);
    }
    updated
}

/// Flip membership of `user_id` on a cached copy, without a backend call.
///
/// Used for optimistic previews; the authoritative result still comes
/// from [`AttendanceReconciler::toggle_attendance`].
#[must_use]
pub fn toggle_local(event: &Event, user_id: UserId) -> Event {
    apply_toggle(event, user_id, !event.is_attended_by(user_id))
}

/// Authoritative RSVP toggling against the backend.
#[derive(Clone)]
pub struct AttendanceReconciler {
    backend: Arc<dyn Backend>,
}

impl AttendanceReconciler {
    /// Create a reconciler over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Toggle `user_id`'s RSVP for `event_id` and return whether they are
    /// attending afterwards.
    ///
    /// # Errors
    ///
    /// - [`RsvpError::EventNotFound`] if the event does not exist
    /// - [`RsvpError::OrganizerCannotRsvp`] if `user_id` organizes the event
    /// - [`RsvpError::AttendeeNotFound`] if `user_id` has no profile row
    /// - [`RsvpError::Persistence`] if the backend fails; nothing is changed
    #[tracing::instrument(skip(self), fields(%event_id, %user_id))]
    pub async fn toggle_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<bool, RsvpError> {
        let (event, profile) = tokio::join!(
            self.backend.find_event(event_id),
            self.backend.find_profile(user_id)
        );

        let event = event
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load event for RSVP"))?
            .ok_or(RsvpError::EventNotFound(event_id))?;

        if event.organizer_id == user_id {
            tracing::debug!("Rejected RSVP by organizer");
            return Err(RsvpError::OrganizerCannotRsvp);
        }

        if profile
            .inspect_err(|e| tracing::error!(error = %e, "Failed to load attendee profile"))?
            .is_none()
        {
            tracing::warn!("RSVP by user without a profile row");
            return Err(RsvpError::AttendeeNotFound(user_id));
        }

        let now_attending = self
            .backend
            .toggle_attendee(event_id, user_id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to toggle attendance"))?;

        let direction = if now_attending { "join" } else { "leave" };
        metrics::counter!("rsvp_attendance_toggles_total", "direction" => direction).increment(1);
        tracing::info!(now_attending, "Attendance toggled");

        Ok(now_attending)
    }
}
