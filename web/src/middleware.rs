//! Request tracking middleware.
//!
//! [`request_tracking_layer`] wraps every request in an `http_request` span
//! carrying a correlation id, echoes that id back in the
//! `X-Correlation-ID` response header and records one
//! `rsvp_http_requests_total{method, status}` sample per response.
//!
//! The id is taken from the incoming header when it is a valid UUID and
//! generated otherwise, then stored in the request extensions where the
//! [`CorrelationId`](crate::extractors::CorrelationId) extractor reads it.

use axum::{extract::Request, http::HeaderValue, response::Response};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the request tracking layer.
///
/// ```ignore
/// let app = Router::new()
///     .route("/api/events", get(list_events))
///     .layer(request_tracking_layer());
/// ```
#[must_use]
pub const fn request_tracking_layer() -> RequestTrackingLayer {
    RequestTrackingLayer
}

/// Layer for [`RequestTracking`].
#[derive(Clone, Copy, Debug)]
pub struct RequestTrackingLayer;

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking { inner }
    }
}

/// Middleware service produced by [`RequestTrackingLayer`].
#[derive(Clone, Debug)]
pub struct RequestTracking<S> {
    inner: S,
}

impl<S> Service<Request> for RequestTracking<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let method = req.method().to_string();
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %method,
            uri = %req.uri(),
        );

        let started = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let mut response = fut.await?;

                let status = response.status();
                tracing::debug!(
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Request finished"
                );
                metrics::counter!(
                    "rsvp_http_requests_total",
                    "method" => method,
                    "status" => status.as_u16().to_string()
                )
                .increment(1);

                if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                    response
                        .headers_mut()
                        .insert(CORRELATION_ID_HEADER, header_value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
