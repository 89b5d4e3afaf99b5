//! Application state for the HTTP server.

use crate::auth::Authenticator;
use crate::services::Services;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Domain services over the backend
    pub services: Services,

    /// Bearer token verification
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(services: Services, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            services,
            authenticator,
        }
    }
}
