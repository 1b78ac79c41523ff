//! `key-server` — key-management service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optionally OTEL).
//! 3. Initialise the AWS KMS client bound to the configured KEK.
//! 4. Open the bounded Postgres connection pool.
//! 5. Build [`KeyService`] over the store and KMS client.
//! 6. Build the Axum router and start the HTTP server.

mod audit;
mod config;
mod kms;
mod server;
mod service;
mod store;
mod telemetry;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use config::Config;
use kms::AwsKms;
use server::state::AppState;
use service::KeyService;
use store::PgKeyStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        otel_enabled = cfg.otel_enabled,
        "key-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. KMS client
    // -----------------------------------------------------------------------
    let kms = AwsKms::init(cfg.kms_key_name.clone()).await;

    // -----------------------------------------------------------------------
    // 4. Database pool
    // -----------------------------------------------------------------------
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&cfg.database_url)
        .await
        .context("failed to connect to the database")?;

    // -----------------------------------------------------------------------
    // 5. Key service
    // -----------------------------------------------------------------------
    let service = KeyService::new(Arc::new(PgKeyStore::new(pool.clone())), Arc::new(kms));
    let state = AppState::new(Arc::new(service), Some(pool));

    // -----------------------------------------------------------------------
    // 6. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind the listening socket")?;
    axum::serve(listener, router).await?;

    Ok(())
}
