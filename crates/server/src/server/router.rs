//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/tenants/:tenant_id/keys",
            post(handlers::create_key).get(handlers::list_keys),
        )
        .route(
            "/v1/tenants/:tenant_id/keys/current",
            get(handlers::get_current_key),
        )
        .route(
            "/v1/tenants/:tenant_id/keys/rotate",
            post(handlers::rotate_key),
        )
        .route(
            "/v1/tenants/:tenant_id/keys/:generation",
            get(handlers::get_key_by_generation).delete(handlers::disable_key),
        )
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(
            middleware::propagate_trace_context,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
