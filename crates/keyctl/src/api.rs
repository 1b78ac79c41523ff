//! HTTP client for the key-management API.

use std::time::Duration;

use common::{ErrorBody, KeyListResponse, KeyMetadata, KeyPayload};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failures surfaced by [`ApiClient`], each mapped to a process exit code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (connect, DNS, timeout)
    /// or the response body could not be read.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Fronting infrastructure rejected the request (HTTP 401/403).
    #[error("authentication failure (HTTP {status})")]
    Auth { status: u16 },

    /// The API answered with a structured error body.
    #[error("{code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A non-2xx response without a parseable error body.
    #[error("unexpected response (HTTP {status})")]
    Unexpected { status: u16 },
}

impl ApiError {
    /// Exit code contract: 1 generic failure, 3 transport, 4 authentication.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::Transport(_) => 3,
            ApiError::Auth { .. } => 4,
            ApiError::Api { .. } | ApiError::Unexpected { .. } => 1,
        }
    }
}

/// Thin typed wrapper over `reqwest` for the tenant key routes.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client against `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn keys_url(&self, tenant: &str) -> String {
        format!("{}/v1/tenants/{tenant}/keys", self.base_url)
    }

    pub async fn create(&self, tenant: &str) -> Result<KeyMetadata, ApiError> {
        let resp = self.http.post(self.keys_url(tenant)).send().await?;
        decode(resp).await
    }

    pub async fn list(&self, tenant: &str) -> Result<KeyListResponse, ApiError> {
        let resp = self.http.get(self.keys_url(tenant)).send().await?;
        decode(resp).await
    }

    pub async fn get_current(&self, tenant: &str) -> Result<KeyPayload, ApiError> {
        let url = format!("{}/current", self.keys_url(tenant));
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    pub async fn get_generation(
        &self,
        tenant: &str,
        generation: i64,
    ) -> Result<KeyPayload, ApiError> {
        let url = format!("{}/{generation}", self.keys_url(tenant));
        let resp = self.http.get(url).send().await?;
        decode(resp).await
    }

    pub async fn rotate(&self, tenant: &str) -> Result<KeyMetadata, ApiError> {
        let url = format!("{}/rotate", self.keys_url(tenant));
        let resp = self.http.post(url).send().await?;
        decode(resp).await
    }

    pub async fn disable(&self, tenant: &str, generation: i64) -> Result<(), ApiError> {
        let url = format!("{}/{generation}", self.keys_url(tenant));
        let resp = self.http.delete(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(error_from(status, resp).await)
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    Err(error_from(status, resp).await)
}

async fn error_from(status: StatusCode, resp: reqwest::Response) -> ApiError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ApiError::Auth {
            status: status.as_u16(),
        };
    }
    match resp.json::<ErrorBody>().await {
        Ok(body) => ApiError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
        },
        Err(_) => ApiError::Unexpected {
            status: status.as_u16(),
        },
    }
}
