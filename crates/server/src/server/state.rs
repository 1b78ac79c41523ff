//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::service::KeyService;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable so that Axum can clone the state for
/// each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// The key lifecycle engine.
    pub service: Arc<KeyService>,
    /// Pool handle for the health probe. `None` in tests that run without a
    /// database.
    pub db: Option<PgPool>,
}

impl AppState {
    pub fn new(service: Arc<KeyService>, db: Option<PgPool>) -> Self {
        Self { service, db }
    }
}
