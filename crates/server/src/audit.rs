//! Structured audit events for every externally-visible operation.
//!
//! Events are emitted to the log sink as `tracing` events with
//! `target: "audit"`, one per façade operation regardless of outcome. When
//! tracing is enabled the enclosing request span carries the trace and span
//! identifiers, so audit lines correlate with distributed traces without
//! duplicating those fields here.
//!
//! An audit event never contains DEK material.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// Log target audit events are emitted under, so sinks can route them.
pub const AUDIT_TARGET: &str = "audit";

/// Outcome recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResult {
    Success,
    Failed,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "SUCCESS",
            AuditResult::Failed => "FAILED",
        }
    }
}

/// One audited operation and its outcome.
#[derive(Debug)]
pub struct AuditEvent<'a> {
    /// Operation name, e.g. `"CreateKey"`.
    pub operation: &'static str,
    pub tenant_id: &'a str,
    /// Generation the operation addressed, when one was resolved.
    pub generation: Option<i64>,
    pub result: AuditResult,
    /// Error code accompanying a `FAILED` result.
    pub error_code: Option<&'a str>,
    /// Per-request v4 UUID tying the audit line to the HTTP exchange.
    pub correlation_id: Uuid,
}

/// Emit `event` to the audit sink. Successes log at info, failures at warn.
pub fn emit(event: &AuditEvent<'_>) {
    let timestamp = Utc::now().to_rfc3339();
    match event.result {
        AuditResult::Success => info!(
            target: AUDIT_TARGET,
            operation = event.operation,
            tenant_id = event.tenant_id,
            generation = event.generation,
            result = event.result.as_str(),
            correlation_id = %event.correlation_id,
            timestamp = %timestamp,
        ),
        AuditResult::Failed => warn!(
            target: AUDIT_TARGET,
            operation = event.operation,
            tenant_id = event.tenant_id,
            generation = event.generation,
            result = event.result.as_str(),
            error_code = event.error_code,
            correlation_id = %event.correlation_id,
            timestamp = %timestamp,
        ),
    }
}
