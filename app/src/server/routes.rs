//! Router configuration.

use super::state::AppState;
use crate::api::{events, profile};
use axum::{
    Router,
    routing::{get, post},
};
use rsvp_web::{handlers::health_check, request_tracking_layer};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health` (no authentication)
/// - `/api/events...` event feed, details, creation and RSVP
/// - `/api/me...` caller profile and personal event lists
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/attendance", post(events::toggle_attendance))
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/me/events", get(profile::my_events))
        .route("/me/attending", get(profile::my_attending));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(request_tracking_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
