//! Tracing subscriber construction, with or without the OTEL pipeline.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Sampler;
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Initialise the global tracing subscriber, and the OTEL pipeline when
/// tracing is enabled.
///
/// Always configures a JSON-formatted [`tracing_subscriber`] layer for
/// structured log output. When `cfg.otel_enabled` is set it additionally
/// installs the W3C TraceContext propagator and a [`tracing_opentelemetry`]
/// layer exporting spans to the configured OTLP endpoint, head-sampled at
/// `cfg.otel_sampling_rate`.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be initialised or a global
/// subscriber is already set.
pub fn init_telemetry(cfg: &Config) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.to_lowercase()));
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    if !cfg.otel_enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("failed to initialise tracing subscriber")?;
        return Ok(());
    }

    // Incoming `traceparent` / `tracestate` headers join remote traces.
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let endpoint = cfg.otel_exporter_otlp_endpoint.as_deref().unwrap_or("");
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                    cfg.otel_sampling_rate,
                ))))
                .with_resource(service_resource(&cfg.otel_service_name)),
        )
        .install_batch(runtime::Tokio)
        .context("failed to install OTLP tracing pipeline")?;

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

fn service_resource(service_name: &str) -> Resource {
    Resource::new(vec![
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            service_name.to_owned(),
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            env!("CARGO_PKG_VERSION"),
        ),
    ])
}
