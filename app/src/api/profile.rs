//! Endpoints scoped to the caller.
//!
//! - GET /api/me - Profile, falling back to session claims
//! - PUT /api/me - Update profile
//! - GET /api/me/events - Events the caller organizes
//! - GET /api/me/attending - Events the caller attends

use crate::auth::SessionUser;
use crate::profiles::ProfileUpdate;
use crate::server::state::AppState;
use crate::types::{Event, User};
use axum::{Json, extract::State};
use rsvp_web::WebResult;

/// Current user.
pub async fn get_me(user: SessionUser, State(state): State<AppState>) -> Json<User> {
    Json(state.services.profiles.current_user(&user.identity).await)
}

/// Update the caller's profile.
pub async fn update_me(
    user: SessionUser,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> WebResult<Json<User>> {
    let updated = state
        .services
        .profiles
        .update_profile(user.user_id(), update)
        .await?;
    Ok(Json(updated))
}

/// Events organized by the caller, private ones included.
pub async fn my_events(user: SessionUser, State(state): State<AppState>) -> WebResult<Json<Vec<Event>>> {
    let events = state.services.queries.fetch_user_events(user.user_id()).await?;
    Ok(Json(events))
}

/// Events the caller attends and does not organize.
pub async fn my_attending(
    user: SessionUser,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Event>>> {
    let events = state
        .services
        .queries
        .fetch_attending_events(user.user_id())
        .await?;
    Ok(Json(events))
}
