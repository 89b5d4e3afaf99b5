//! # RSVP
//!
//! Event discovery and RSVP service.
//!
//! Events, attendance and profiles live in a relational backend
//! ([`rsvp_core::Backend`]). This crate holds the domain on top of it:
//!
//! - **Attendance Reconciler** ([`attendance`]): atomic RSVP toggle and cache reconciliation
//! - **Event Query Facade** ([`queries`]): batched, denormalized event reads
//! - **Event Creation Flow** ([`creation`]): validate, check organizer, persist
//! - **Event board** ([`board`]): reducer-driven client cache over the services
//! - **Filters** ([`filters`]), **profiles** ([`profiles`]) and the **auth seam** ([`auth`])
//! - **HTTP API** ([`api`], [`server`])
//!
//! Every operation takes the acting user's id explicitly.
//!
//! ## Example
//!
//! ```ignore
//! let backend: Arc<dyn Backend> = Arc::new(PostgresBackend::connect(url, 10, 2, 30).await?);
//! let services = Services::new(backend, Arc::new(SystemClock));
//!
//! let now_attending = services.attendance.toggle_attendance(event_id, user_id).await?;
//! let attending = services.queries.fetch_attending_events(user_id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod attendance;
pub mod auth;
pub mod board;
pub mod config;
pub mod creation;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod profiles;
pub mod queries;
pub mod server;
pub mod services;
pub mod types;

pub use attendance::{AttendanceReconciler, apply_toggle, rsvp_notice, toggle_local};
pub use auth::{Authenticator, Identity, JwtAuthenticator, SessionUser};
pub use board::{BoardAction, BoardReducer, BoardState};
pub use config::Config;
pub use creation::EventCreator;
pub use error::RsvpError;
pub use profiles::{ProfileService, ProfileUpdate};
pub use queries::EventQueries;
pub use server::{AppState, build_router};
pub use services::Services;
pub use types::{DateRange, Event, EventDraft, EventFilters, EventId, User, UserId};
