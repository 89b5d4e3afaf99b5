//! Service bundle shared by the HTTP handlers and the event board.
//!
//! Every service holds the same `Arc<dyn Backend>`, so cloning the bundle
//! is a handful of reference-count increments.

use crate::attendance::AttendanceReconciler;
use crate::creation::EventCreator;
use crate::profiles::ProfileService;
use crate::queries::EventQueries;
use rsvp_core::Backend;
use rsvp_core::environment::Clock;
use std::sync::Arc;

/// Read, write and profile operations over one backend.
#[derive(Clone)]
pub struct Services {
    /// Event Query Facade
    pub queries: EventQueries,
    /// Attendance Reconciler
    pub attendance: AttendanceReconciler,
    /// Event Creation Flow
    pub creator: EventCreator,
    /// Profile reads and edits
    pub profiles: ProfileService,
    /// Source of "today" for upcoming-event filtering
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Wire every service to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            queries: EventQueries::new(Arc::clone(&backend)),
            attendance: AttendanceReconciler::new(Arc::clone(&backend)),
            creator: EventCreator::new(Arc::clone(&backend)),
            profiles: ProfileService::new(backend, Arc::clone(&clock)),
            clock,
        }
    }
}
