//! Local event board.
//!
//! A client-side cache of the three event lists driven by a reducer. Commands
//! never touch the cached lists: they only return an [`Effect::Future`] that
//! calls a service, and the lists are replaced or reconciled when the
//! resulting action comes back. The backend stays the system of record.
//!
//! ```ignore
//! let store = Store::new(BoardState::default(), BoardReducer, services);
//! store.send(BoardAction::LoadPublic).await;
//! store.send(BoardAction::ToggleAttendance { event_id, user_id }).await;
//! let notice = store.state(|s| s.notice.clone()).await;
//! ```

use crate::attendance::{apply_toggle, rsvp_notice};
use crate::error::RsvpError;
use crate::services::Services;
use crate::types::{Event, EventDraft, EventId, UserId};
use rsvp_core::effect::Effect;
use rsvp_core::reducer::Reducer;
use smallvec::{SmallVec, smallvec};

/// Cached event lists plus the last user-facing outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardState {
    /// Public feed
    pub public: Vec<Event>,
    /// Events the viewer organizes
    pub organizing: Vec<Event>,
    /// Events the viewer attends
    pub attending: Vec<Event>,
    /// Copy for the last successful mutation
    pub notice: Option<String>,
    /// Message of the last failed operation
    pub last_error: Option<String>,
}

/// Board commands and their results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardAction {
    // Commands
    /// Refresh the public feed
    LoadPublic,
    /// Refresh the events `user_id` organizes
    LoadOrganizing {
        /// Viewer
        user_id: UserId,
    },
    /// Refresh the events `user_id` attends
    LoadAttending {
        /// Viewer
        user_id: UserId,
    },
    /// RSVP or cancel
    ToggleAttendance {
        /// Target event
        event_id: EventId,
        /// Acting user
        user_id: UserId,
    },
    /// Create an event
    CreateEvent {
        /// Creation input
        draft: EventDraft,
    },

    // Results
    /// Public feed fetched
    PublicLoaded {
        /// Denormalized events
        events: Vec<Event>,
    },
    /// Organized events fetched
    OrganizingLoaded {
        /// Denormalized events
        events: Vec<Event>,
    },
    /// Attended events fetched
    AttendingLoaded {
        /// Denormalized events
        events: Vec<Event>,
    },
    /// Authoritative toggle result
    AttendanceToggled {
        /// Target event
        event_id: EventId,
        /// Acting user
        user_id: UserId,
        /// Membership after the toggle
        now_attending: bool,
    },
    /// Event persisted
    EventCreated {
        /// The new event
        event: Event,
    },
    /// A service call failed; caches are left untouched
    OperationFailed {
        /// Display message
        message: String,
    },
}

/// Reducer for [`BoardState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BoardReducer;

fn failed(error: &RsvpError) -> BoardAction {
    BoardAction::OperationFailed {
        message: error.to_string(),
    }
}

fn insert_by_date(events: &mut Vec<Event>, event: Event) {
    let index = events.partition_point(|existing| existing.date <= event.date);
    events.insert(index, event);
}

impl BoardReducer {
    fn reconcile_toggle(
        state: &mut BoardState,
        event_id: EventId,
        user_id: UserId,
        now_attending: bool,
    ) {
        for list in [&mut state.public, &mut state.organizing] {
            for event in list.iter_mut().filter(|event| event.id == event_id) {
                *event = apply_toggle(event, user_id, now_attending);
            }
        }

        state.attending.retain(|event| event.id != event_id);
        if now_attending {
            let cached = state.public.iter().find(|event| event.id == event_id).cloned();
            if let Some(event) = cached {
                insert_by_date(&mut state.attending, event);
            }
        }

        state.notice = Some(rsvp_notice(now_attending).to_string());
        state.last_error = None;
    }
}

impl Reducer for BoardReducer {
    type State = BoardState;
    type Action = BoardAction;
    type Environment = Services;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            BoardAction::LoadPublic => {
                let queries = env.queries.clone();
                smallvec![Effect::future(async move {
                    Some(match queries.fetch_public_events().await {
                        Ok(events) => BoardAction::PublicLoaded { events },
                        Err(e) => failed(&e),
                    })
                })]
            },
            BoardAction::LoadOrganizing { user_id } => {
                let queries = env.queries.clone();
                smallvec![Effect::future(async move {
                    Some(match queries.fetch_user_events(user_id).await {
                        Ok(events) => BoardAction::OrganizingLoaded { events },
                        Err(e) => failed(&e),
                    })
                })]
            },
            BoardAction::LoadAttending { user_id } => {
                let queries = env.queries.clone();
                smallvec![Effect::future(async move {
                    Some(match queries.fetch_attending_events(user_id).await {
                        Ok(events) => BoardAction::AttendingLoaded { events },
                        Err(e) => failed(&e),
                    })
                })]
            },
            BoardAction::ToggleAttendance { event_id, user_id } => {
                let attendance = env.attendance.clone();
                smallvec![Effect::future(async move {
                    Some(match attendance.toggle_attendance(event_id, user_id).await {
                        Ok(now_attending) => BoardAction::AttendanceToggled {
                            event_id,
                            user_id,
                            now_attending,
                        },
                        Err(e) => failed(&e),
                    })
                })]
            },
            BoardAction::CreateEvent { draft } => {
                let creator = env.creator.clone();
                smallvec![Effect::future(async move {
                    Some(match creator.create_event(draft).await {
                        Ok(event) => BoardAction::EventCreated { event },
                        Err(e) => failed(&e),
                    })
                })]
            },

            // ========== Results ==========
            BoardAction::PublicLoaded { events } => {
                state.public = events;
                state.last_error = None;
                SmallVec::new()
            },
            BoardAction::OrganizingLoaded { events } => {
                state.organizing = events;
                state.last_error = None;
                SmallVec::new()
            },
            BoardAction::AttendingLoaded { events } => {
                state.attending = events;
                state.last_error = None;
                SmallVec::new()
            },
            BoardAction::AttendanceToggled {
                event_id,
                user_id,
                now_attending,
            } => {
                Self::reconcile_toggle(state, event_id, user_id, now_attending);
                SmallVec::new()
            },
            BoardAction::EventCreated { event } => {
                if event.is_public {
                    insert_by_date(&mut state.public, event.clone());
                }
                insert_by_date(&mut state.organizing, event);
                state.notice = Some("Event created".to_string());
                state.last_error = None;
                SmallVec::new()
            },
            BoardAction::OperationFailed { message } => {
                tracing::warn!(%message, "Board operation failed");
                state.last_error = Some(message);
                SmallVec::new()
            },
        }
    }
}
