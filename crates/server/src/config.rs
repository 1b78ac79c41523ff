//! Configuration loading and validation for the key-management server.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Log levels accepted in `LOG_LEVEL` (case-insensitive).
const LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARN", "ERROR"];

/// Validated server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listening port of the HTTP API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Postgres connection string. **Required.**
    pub database_url: String,

    /// KMS resource identifier of the key-encryption key. **Required.**
    pub kms_key_name: String,

    /// Log level: DEBUG, INFO, WARN, or ERROR.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// When `false`, no tracer is installed and logs carry no trace fields.
    #[serde(default)]
    pub otel_enabled: bool,

    /// OTLP endpoint spans are exported to. Required when tracing is enabled.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// `service.name` resource attribute on exported spans.
    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    /// Head-sampling ratio in `[0, 1]`.
    #[serde(default = "default_otel_sampling_rate")]
    pub otel_sampling_rate: f64,
}

fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "INFO".into()
}
fn default_otel_service_name() -> String {
    "key-management-service".into()
}
fn default_otel_sampling_rate() -> f64 {
    1.0
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.database_url, "DATABASE_URL")?;
        ensure_non_empty(&self.kms_key_name, "KMS_KEY_NAME")?;

        if !LOG_LEVELS
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&self.log_level))
        {
            anyhow::bail!(
                "LOG_LEVEL must be one of DEBUG, INFO, WARN, ERROR (got {:?})",
                self.log_level
            );
        }
        if !(0.0..=1.0).contains(&self.otel_sampling_rate) {
            anyhow::bail!(
                "OTEL_SAMPLING_RATE must be within [0, 1] (got {})",
                self.otel_sampling_rate
            );
        }
        if self.otel_enabled {
            let endpoint = self.otel_exporter_otlp_endpoint.as_deref().unwrap_or("");
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT is required when OTEL_ENABLED=true");
            }
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
