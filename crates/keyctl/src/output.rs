//! Rendering of command results in text and JSON form.
//!
//! Functions here return the final string so they can be asserted on
//! directly; `main` is the only place that prints.

use common::{KeyListResponse, KeyMetadata, KeyPayload};
use migrate::MigrationStatus;
use serde_json::json;

use crate::cli::OutputFormat;

pub fn format_metadata(meta: &KeyMetadata, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "tenant={} generation={} status={} created_at={}",
            meta.tenant_id,
            meta.generation,
            meta.status,
            meta.created_at.to_rfc3339()
        ),
        OutputFormat::Json => pretty(meta),
    }
}

pub fn format_payload(payload: &KeyPayload, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "tenant={} generation={} key={}",
            payload.tenant_id, payload.generation, payload.key
        ),
        OutputFormat::Json => pretty(payload),
    }
}

pub fn format_list(list: &KeyListResponse, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if list.keys.is_empty() {
                return "no keys".into();
            }
            list.keys
                .iter()
                .map(|k| {
                    format!(
                        "generation={} status={} created_at={}",
                        k.generation,
                        k.status,
                        k.created_at.to_rfc3339()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Json => pretty(list),
    }
}

pub fn format_disabled(tenant: &str, generation: i64, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("disabled tenant={tenant} generation={generation}"),
        OutputFormat::Json => pretty(&json!({
            "tenant_id": tenant,
            "generation": generation,
            "status": "disabled",
        })),
    }
}

pub fn format_migrate_run(applied: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if applied.is_empty() {
                "no pending migrations".into()
            } else {
                applied
                    .iter()
                    .map(|v| format!("applied {v}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        OutputFormat::Json => pretty(&json!({ "applied": applied })),
    }
}

pub fn format_migrate_status(statuses: &[MigrationStatus], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if statuses.is_empty() {
                return "no migrations on disk".into();
            }
            statuses
                .iter()
                .map(|s| match &s.applied_at {
                    Some(at) => {
                        format!("{} {} applied {}", s.version, s.description, at.to_rfc3339())
                    }
                    None => format!("{} {} pending", s.version, s.description),
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Json => {
            let rows: Vec<_> = statuses
                .iter()
                .map(|s| {
                    json!({
                        "version": s.version,
                        "description": s.description,
                        "applied_at": s.applied_at.map(|at| at.to_rfc3339()),
                    })
                })
                .collect();
            pretty(&json!({ "migrations": rows }))
        }
    }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialisation error: {e}"))
}
