//! Axum integration for the RSVP service.
//!
//! The application crate owns the routes and the domain; this crate holds
//! the HTTP plumbing they share:
//!
//! - [`AppError`]: status code + JSON body for every failed request
//! - [`request_tracking_layer`]: correlation ids, request spans, request counter
//! - [`CorrelationId`] / [`BearerToken`]: extractors
//! - [`handlers::health_check`]: liveness endpoint
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives and gets a correlation id and span
//! 2. **Extract** path, query, JSON body and bearer token
//! 3. **Call** the domain service with the acting user's id
//! 4. **Map** the domain result or error to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use rsvp_web::{handlers::health_check, request_tracking_layer};
//!
//! let app = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(request_tracking_layer());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, request_tracking_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
