//! Axum request handlers for all service endpoints.
//!
//! Every key route follows the same order: validate path parameters, invoke
//! the key service, map the outcome to a status and wire body, and emit one
//! audit event. Plaintext DEKs are base64-encoded at the last moment and the
//! buffer is dropped (zeroed) immediately after.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use common::error::code;
use common::protocol::HealthResponse;
use common::{ErrorBody, KeyListResponse, KeyPayload};
use tracing::{error, warn};
use uuid::Uuid;

use super::state::AppState;
use super::validate;
use crate::audit::{self, AuditEvent, AuditResult};
use crate::service::{KeyMaterial, KeyServiceError};

/// `POST /v1/tenants/{tenant_id}/keys` — bootstrap the tenant at generation 1.
pub async fn create_key(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("CreateKey", &tenant_id, correlation_id);
    }

    match state.service.create_key(&tenant_id).await {
        Ok(meta) => {
            record_success("CreateKey", &tenant_id, Some(meta.generation), correlation_id);
            (StatusCode::CREATED, Json(meta)).into_response()
        }
        Err(err) => record_failure("CreateKey", &tenant_id, None, &err, correlation_id),
    }
}

/// `GET /v1/tenants/{tenant_id}/keys` — metadata for every generation.
pub async fn list_keys(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("ListKeys", &tenant_id, correlation_id);
    }

    match state.service.list_keys(&tenant_id).await {
        Ok(keys) => {
            record_success("ListKeys", &tenant_id, None, correlation_id);
            (StatusCode::OK, Json(KeyListResponse { keys })).into_response()
        }
        Err(err) => record_failure("ListKeys", &tenant_id, None, &err, correlation_id),
    }
}

/// `GET /v1/tenants/{tenant_id}/keys/current` — decrypt the newest active key.
pub async fn get_current_key(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("GetCurrentKey", &tenant_id, correlation_id);
    }

    match state.service.get_current_key(&tenant_id).await {
        Ok(material) => {
            record_success(
                "GetCurrentKey",
                &tenant_id,
                Some(material.generation),
                correlation_id,
            );
            payload_response(material)
        }
        Err(err) => record_failure("GetCurrentKey", &tenant_id, None, &err, correlation_id),
    }
}

/// `GET /v1/tenants/{tenant_id}/keys/{generation}` — decrypt one generation.
pub async fn get_key_by_generation(
    State(state): State<AppState>,
    Path((tenant_id, generation)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("GetKeyByGeneration", &tenant_id, correlation_id);
    }
    let Some(generation) = validate::parse_generation(&generation) else {
        return reject_generation("GetKeyByGeneration", &tenant_id, correlation_id);
    };

    match state
        .service
        .get_key_by_generation(&tenant_id, generation)
        .await
    {
        Ok(material) => {
            record_success(
                "GetKeyByGeneration",
                &tenant_id,
                Some(generation),
                correlation_id,
            );
            payload_response(material)
        }
        Err(err) => record_failure(
            "GetKeyByGeneration",
            &tenant_id,
            Some(generation),
            &err,
            correlation_id,
        ),
    }
}

/// `POST /v1/tenants/{tenant_id}/keys/rotate` — append generation N+1.
pub async fn rotate_key(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("RotateKey", &tenant_id, correlation_id);
    }

    match state.service.rotate_key(&tenant_id).await {
        Ok(meta) => {
            record_success("RotateKey", &tenant_id, Some(meta.generation), correlation_id);
            (StatusCode::CREATED, Json(meta)).into_response()
        }
        Err(err) => record_failure("RotateKey", &tenant_id, None, &err, correlation_id),
    }
}

/// `DELETE /v1/tenants/{tenant_id}/keys/{generation}` — disable one generation.
pub async fn disable_key(
    State(state): State<AppState>,
    Path((tenant_id, generation)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    if !validate::tenant_id_is_valid(&tenant_id) {
        return reject_tenant("DisableKey", &tenant_id, correlation_id);
    }
    let Some(generation) = validate::parse_generation(&generation) else {
        return reject_generation("DisableKey", &tenant_id, correlation_id);
    };

    match state.service.disable_key(&tenant_id, generation).await {
        Ok(()) => {
            record_success("DisableKey", &tenant_id, Some(generation), correlation_id);
            StatusCode::ACCEPTED.into_response()
        }
        Err(err) => record_failure(
            "DisableKey",
            &tenant_id,
            Some(generation),
            &err,
            correlation_id,
        ),
    }
}

/// `GET /health` — liveness and database reachability. Not audited.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match &state.db {
        Some(pool) => sqlx::query("SELECT 1").execute(pool).await.is_ok(),
        None => false,
    };

    let (status_code, status_str) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        database,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorBody::new("NOT_FOUND", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Outcome mapping and audit plumbing
// ---------------------------------------------------------------------------

/// Status, wire code, and fixed message for a service error. Infrastructure
/// details never reach the body.
fn service_error_parts(err: &KeyServiceError) -> (StatusCode, &'static str, &'static str) {
    match err {
        KeyServiceError::NotFound => (
            StatusCode::NOT_FOUND,
            code::KEY_NOT_FOUND,
            "no key exists for the tenant or generation",
        ),
        KeyServiceError::AlreadyExists => (
            StatusCode::CONFLICT,
            code::KEY_ALREADY_EXISTS,
            "a key already exists for the tenant",
        ),
        KeyServiceError::Disabled => (
            StatusCode::GONE,
            code::KEY_DISABLED,
            "the key generation has been disabled",
        ),
        KeyServiceError::AlreadyDisabled => (
            StatusCode::CONFLICT,
            code::KEY_ALREADY_DISABLED,
            "the key generation is already disabled",
        ),
        KeyServiceError::Conflict => (
            StatusCode::CONFLICT,
            code::CONFLICT,
            "a concurrent update was applied first; retry",
        ),
        KeyServiceError::Kms(_) | KeyServiceError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            code::INTERNAL_ERROR,
            "internal error",
        ),
    }
}

fn record_success(
    operation: &'static str,
    tenant_id: &str,
    generation: Option<i64>,
    correlation_id: Uuid,
) {
    audit::emit(&AuditEvent {
        operation,
        tenant_id,
        generation,
        result: AuditResult::Success,
        error_code: None,
        correlation_id,
    });
}

fn record_failure(
    operation: &'static str,
    tenant_id: &str,
    generation: Option<i64>,
    err: &KeyServiceError,
    correlation_id: Uuid,
) -> Response {
    let (status, error_code, message) = service_error_parts(err);
    if err.is_domain() {
        warn!(operation, tenant_id, error_code, "domain error");
    } else {
        error!(operation, tenant_id, error = ?err, "infrastructure error");
    }
    audit::emit(&AuditEvent {
        operation,
        tenant_id,
        generation,
        result: AuditResult::Failed,
        error_code: Some(error_code),
        correlation_id,
    });
    (status, Json(ErrorBody::new(error_code, message))).into_response()
}

fn reject_tenant(operation: &'static str, tenant_id: &str, correlation_id: Uuid) -> Response {
    reject(
        operation,
        tenant_id,
        code::INVALID_TENANT_ID,
        "tenant_id must match ^[A-Za-z0-9_-]{1,64}$",
        correlation_id,
    )
}

fn reject_generation(operation: &'static str, tenant_id: &str, correlation_id: Uuid) -> Response {
    reject(
        operation,
        tenant_id,
        code::INVALID_GENERATION,
        "generation must be an integer >= 1",
        correlation_id,
    )
}

fn reject(
    operation: &'static str,
    tenant_id: &str,
    error_code: &'static str,
    message: &'static str,
    correlation_id: Uuid,
) -> Response {
    audit::emit(&AuditEvent {
        operation,
        tenant_id,
        generation: None,
        result: AuditResult::Failed,
        error_code: Some(error_code),
        correlation_id,
    });
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody::new(error_code, message)),
    )
        .into_response()
}

/// Encode the DEK for the wire; `material` (and the plaintext buffer inside
/// it) is dropped as soon as the body is built.
fn payload_response(material: KeyMaterial) -> Response {
    let body = KeyPayload {
        tenant_id: material.tenant_id.clone(),
        generation: material.generation,
        key: BASE64.encode(material.dek.as_bytes()),
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use common::KeyStatus;
    use tower::ServiceExt;

    use crate::server::router;
    use crate::testutil::test_state;

    fn app() -> Router {
        router::build(test_state())
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn create_then_duplicate_create() {
        let app = app();

        let (status, body) = send(&app, "POST", "/v1/tenants/tenant-001/keys").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["tenant_id"], "tenant-001");
        assert_eq!(body["generation"], 1);
        assert_eq!(body["status"], "active");
        assert!(body["created_at"].is_string());

        let (status, body) = send(&app, "POST", "/v1/tenants/tenant-001/keys").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "KEY_ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn rotation_advances_current() {
        let app = app();
        send(&app, "POST", "/v1/tenants/t/keys").await;

        for expected in 2..=4 {
            let (status, body) = send(&app, "POST", "/v1/tenants/t/keys/rotate").await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["generation"], expected);
        }

        let (status, body) = send(&app, "GET", "/v1/tenants/t/keys/current").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generation"], 4);
        let key = BASE64.decode(body["key"].as_str().unwrap()).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[tokio::test]
    async fn disable_then_retrieve_each_generation() {
        let app = app();
        send(&app, "POST", "/v1/tenants/t/keys").await;
        let (_, gen1_before) = send(&app, "GET", "/v1/tenants/t/keys/1").await;
        send(&app, "POST", "/v1/tenants/t/keys/rotate").await;

        let (status, _) = send(&app, "DELETE", "/v1/tenants/t/keys/2").await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(&app, "GET", "/v1/tenants/t/keys/2").await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["code"], "KEY_DISABLED");

        // Untouched generations stay retrievable with their original bytes.
        let (status, gen1_after) = send(&app, "GET", "/v1/tenants/t/keys/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gen1_after["key"], gen1_before["key"]);
    }

    #[tokio::test]
    async fn disable_twice_conflicts() {
        let app = app();
        send(&app, "POST", "/v1/tenants/t/keys").await;

        let (status, _) = send(&app, "DELETE", "/v1/tenants/t/keys/1").await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(&app, "DELETE", "/v1/tenants/t/keys/1").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "KEY_ALREADY_DISABLED");
    }

    #[tokio::test]
    async fn invalid_tenant_id_is_rejected() {
        let app = app();
        let (status, body) = send(&app, "POST", "/v1/tenants/has%20space!/keys").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_TENANT_ID");
    }

    #[tokio::test]
    async fn invalid_generation_is_rejected() {
        let app = app();
        send(&app, "POST", "/v1/tenants/t/keys").await;

        let (status, body) = send(&app, "GET", "/v1/tenants/t/keys/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_GENERATION");

        let (status, body) = send(&app, "DELETE", "/v1/tenants/t/keys/0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_GENERATION");
    }

    #[tokio::test]
    async fn rotate_without_prior_key_is_not_found() {
        let app = app();
        let (status, body) = send(&app, "POST", "/v1/tenants/unknown/keys/rotate").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "KEY_NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_generation_is_not_found() {
        let app = app();
        send(&app, "POST", "/v1/tenants/t/keys").await;
        let (status, body) = send(&app, "GET", "/v1/tenants/t/keys/7").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "KEY_NOT_FOUND");
    }

    #[tokio::test]
    async fn list_reports_every_generation_in_order() {
        let app = app();

        let (status, body) = send(&app, "GET", "/v1/tenants/t/keys").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keys"].as_array().unwrap().len(), 0);

        send(&app, "POST", "/v1/tenants/t/keys").await;
        send(&app, "POST", "/v1/tenants/t/keys/rotate").await;
        send(&app, "DELETE", "/v1/tenants/t/keys/1").await;

        let (_, body) = send(&app, "GET", "/v1/tenants/t/keys").await;
        let keys = body["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["generation"], 1);
        assert_eq!(keys[0]["status"], KeyStatus::Disabled.as_str());
        assert_eq!(keys[1]["generation"], 2);
        assert_eq!(keys[1]["status"], KeyStatus::Active.as_str());
        // Metadata responses never carry key material.
        assert!(keys[0].get("key").is_none());
    }

    #[tokio::test]
    async fn health_degraded_without_database() {
        let app = app();
        let (status, body) = send(&app, "GET", "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["database"], false);
    }
}
