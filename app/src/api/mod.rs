//! HTTP API handlers.
//!
//! Handlers are thin adapters: extract the caller and the input, call one
//! service operation, convert the result. Domain errors become [`AppError`]s
//! through `From<RsvpError>`.
//!
//! [`AppError`]: rsvp_web::AppError

pub mod events;
pub mod profile;
