//! Request and response types exchanged between the server and its callers.
//!
//! These types are serialised as JSON on the public HTTP API and parsed back
//! by `keyctl`, so field names here are the wire contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Key lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a single key generation.
///
/// Transitions are monotonic: `Active` -> `Disabled`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Active,
    Disabled,
}

impl KeyStatus {
    /// Canonical lowercase form, as persisted and as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(KeyStatus::Active),
            "disabled" => Ok(KeyStatus::Disabled),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Returned when a persisted status string is neither `active` nor `disabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Metadata describing one key generation. Never contains key material.
///
/// Returned by `POST /keys`, `POST /keys/rotate`, and (as a list) `GET /keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub tenant_id: String,
    pub generation: i64,
    pub status: KeyStatus,
    /// RFC3339 creation timestamp, UTC.
    pub created_at: DateTime<Utc>,
}

/// A decrypted data-encryption key, returned only on the retrieval routes.
///
/// `key` is the standard-base64 encoding of the 32-byte plaintext DEK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPayload {
    pub tenant_id: String,
    pub generation: i64,
    pub key: String,
}

/// Response body for `GET /v1/tenants/{tenant_id}/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyListResponse {
    pub keys: Vec<KeyMetadata>,
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether the database answered the liveness probe.
    pub database: bool,
}
