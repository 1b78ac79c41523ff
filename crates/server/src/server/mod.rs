//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Validate path parameters before anything reaches the key service.
//! - Map service errors to HTTP statuses and wire error codes.
//! - Emit one audit event per request handled.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod validate;
