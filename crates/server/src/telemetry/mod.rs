//! Telemetry setup: structured JSON logs, optional OTLP span export.
//!
//! # Telemetry invariants
//!
//! - **No DEK material** must appear in any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `INFO`).
//! - When `OTEL_ENABLED=false` (the default) no tracer is installed and
//!   logs carry no trace fields.

pub mod init;

pub use init::init_telemetry;
