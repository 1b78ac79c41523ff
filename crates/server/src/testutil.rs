//! In-memory implementations of the service seams, used across test modules.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::KeyStatus;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::kms::{KmsClient, KmsError};
use crate::server::state::AppState;
use crate::service::KeyService;
use crate::store::{KeyRecord, KeyStore, NewKeyRecord, StoreError};

/// Prefix [`FakeKms`] puts in front of every "wrapped" blob.
pub const WRAP_PREFIX: &[u8] = b"wrapped:";

/// Deterministic stand-in for the external KMS: wrapping prefixes the
/// plaintext, unwrapping strips the prefix. Lossless, so round-trip tests
/// can compare plaintext bytes.
pub struct FakeKms;

#[async_trait]
impl KmsClient for FakeKms {
    async fn wrap_dek(&self, plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        Ok([WRAP_PREFIX, plaintext].concat())
    }

    async fn unwrap_dek(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        ciphertext
            .strip_prefix(WRAP_PREFIX)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| KmsError::Request("ciphertext missing test prefix".into()))
    }
}

/// Vec-backed [`KeyStore`] enforcing the same `(tenant_id, generation)`
/// uniqueness as the Postgres schema.
#[derive(Default)]
pub struct InMemoryKeyStore {
    rows: Mutex<Vec<KeyRecord>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn exists_for_tenant(&self, tenant_id: &str) -> Result<bool, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows.iter().any(|r| r.tenant_id == tenant_id))
    }

    async fn insert(&self, new: NewKeyRecord) -> Result<KeyRecord, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|r| r.tenant_id == new.tenant_id && r.generation == new.generation)
        {
            return Err(StoreError::Conflict);
        }
        let now = Utc::now();
        let record = KeyRecord {
            id: Uuid::new_v4(),
            tenant_id: new.tenant_id,
            generation: new.generation,
            wrapped_dek: new.wrapped_dek,
            status: KeyStatus::Active,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_tenant_and_generation(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<Option<KeyRecord>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|r| r.tenant_id == tenant_id && r.generation == generation)
            .cloned())
    }

    async fn find_latest_active(&self, tenant_id: &str) -> Result<Option<KeyRecord>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.status == KeyStatus::Active)
            .max_by_key(|r| r.generation)
            .cloned())
    }

    async fn find_all_by_tenant(&self, tenant_id: &str) -> Result<Vec<KeyRecord>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<KeyRecord> = rows
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.generation);
        Ok(matching)
    }

    async fn max_generation(&self, tenant_id: &str) -> Result<i64, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.generation)
            .max()
            .unwrap_or(0))
    }

    async fn update_status(&self, id: Uuid, status: KeyStatus) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = status;
            row.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// An [`AppState`] wired to the in-memory store and fake KMS, no database.
pub fn test_state() -> AppState {
    let service = KeyService::new(Arc::new(InMemoryKeyStore::new()), Arc::new(FakeKms));
    AppState::new(Arc::new(service), None)
}
