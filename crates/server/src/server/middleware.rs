//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression, and
//! W3C TraceContext extraction.

use std::time::Duration;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Default per-request timeout applied to all routes. Dropping the request
/// future on expiry aborts in-flight database and KMS awaits at their next
/// suspension point.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Adopt the remote trace context from `traceparent` / `tracestate` headers.
///
/// A no-op unless a propagator was installed at telemetry init (i.e. when
/// tracing is enabled).
pub async fn propagate_trace_context(req: Request, next: Next) -> Response {
    let parent = opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(req.headers()))
    });
    tracing::Span::current().set_parent(parent);
    next.run(req).await
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl opentelemetry::propagation::Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}
