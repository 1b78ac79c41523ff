//! Persistence of wrapped DEK records.
//!
//! The [`KeyStore`] trait is the capability the key service consumes; the
//! production implementation is [`PgKeyStore`]. Single-record lookups signal
//! "absent" with `Ok(None)`; an `Err` always means an I/O or schema failure,
//! and callers rely on that distinction.

pub mod postgres;

pub use postgres::PgKeyStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::KeyStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint violation on `(tenant_id, generation)`. The database
    /// is the serialization point for concurrent create/rotate; this variant
    /// is the loser's signal.
    #[error("unique constraint violation on (tenant_id, generation)")]
    Conflict,

    /// The database rejected or failed the query.
    #[error("database query failed")]
    Database(#[from] sqlx::Error),

    /// A persisted row violates the schema contract (e.g. unknown status).
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// One persisted key generation, wrapped DEK included.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub generation: i64,
    /// KMS ciphertext of the 32-byte DEK. Never mutated after insert.
    pub wrapped_dek: Vec<u8>,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the caller supplies on insert. The store mints the id, stamps both
/// timestamps, and sets the status to `active`.
#[derive(Debug, Clone)]
pub struct NewKeyRecord {
    pub tenant_id: String,
    pub generation: i64,
    pub wrapped_dek: Vec<u8>,
}

/// Capability consumed by [`crate::service::KeyService`].
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Whether the tenant has at least one key generation.
    async fn exists_for_tenant(&self, tenant_id: &str) -> Result<bool, StoreError>;

    /// Insert a new `active` record, returning it with id and timestamps
    /// assigned. Fails with [`StoreError::Conflict`] when `(tenant_id,
    /// generation)` is already taken.
    async fn insert(&self, new: NewKeyRecord) -> Result<KeyRecord, StoreError>;

    async fn find_by_tenant_and_generation(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<Option<KeyRecord>, StoreError>;

    /// The highest-generation record whose status is `active`.
    async fn find_latest_active(&self, tenant_id: &str) -> Result<Option<KeyRecord>, StoreError>;

    /// Every generation for the tenant, ordered by generation ascending.
    async fn find_all_by_tenant(&self, tenant_id: &str) -> Result<Vec<KeyRecord>, StoreError>;

    /// Highest generation present for the tenant; 0 when the tenant has none.
    async fn max_generation(&self, tenant_id: &str) -> Result<i64, StoreError>;

    /// Update the status of the record with `id`. The caller guarantees the
    /// transition is `active -> disabled`.
    async fn update_status(&self, id: Uuid, status: KeyStatus) -> Result<(), StoreError>;
}
