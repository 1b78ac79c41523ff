//! Postgres-backed [`KeyStore`] over the `encryption_keys` table.
//!
//! All queries are parameter-bound. `created_at` / `updated_at` are assigned
//! by `now()` inside the insert statement, so within a tenant the commit
//! order of generations is also their timestamp order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::KeyStatus;
use sqlx::PgPool;
use uuid::Uuid;

use super::{KeyRecord, KeyStore, NewKeyRecord, StoreError};

const COLUMNS: &str = "id, tenant_id, generation, wrapped_dek, status, created_at, updated_at";

/// Raw row shape; `status` is converted on the way out.
#[derive(sqlx::FromRow)]
struct KeyRow {
    id: Uuid,
    tenant_id: String,
    generation: i64,
    wrapped_dek: Vec<u8>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl KeyRow {
    fn into_record(self) -> Result<KeyRecord, StoreError> {
        let status: KeyStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("row {}: {e}", self.id)))?;
        Ok(KeyRecord {
            id: self.id,
            tenant_id: self.tenant_id,
            generation: self.generation,
            wrapped_dek: self.wrapped_dek,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// [`KeyStore`] implementation over a shared [`PgPool`].
#[derive(Clone)]
pub struct PgKeyStore {
    pool: PgPool,
}

impl PgKeyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn exists_for_tenant(&self, tenant_id: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM encryption_keys WHERE tenant_id = $1)")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert(&self, new: NewKeyRecord) -> Result<KeyRecord, StoreError> {
        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "INSERT INTO encryption_keys ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, 'active', now(), now()) \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&new.tenant_id)
        .bind(new.generation)
        .bind(&new.wrapped_dek)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        row.into_record()
    }

    async fn find_by_tenant_and_generation(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<Option<KeyRecord>, StoreError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {COLUMNS} FROM encryption_keys WHERE tenant_id = $1 AND generation = $2"
        ))
        .bind(tenant_id)
        .bind(generation)
        .fetch_optional(&self.pool)
        .await?;
        row.map(KeyRow::into_record).transpose()
    }

    async fn find_latest_active(&self, tenant_id: &str) -> Result<Option<KeyRecord>, StoreError> {
        let row = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {COLUMNS} FROM encryption_keys \
             WHERE tenant_id = $1 AND status = 'active' \
             ORDER BY generation DESC LIMIT 1"
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(KeyRow::into_record).transpose()
    }

    async fn find_all_by_tenant(&self, tenant_id: &str) -> Result<Vec<KeyRecord>, StoreError> {
        let rows = sqlx::query_as::<_, KeyRow>(&format!(
            "SELECT {COLUMNS} FROM encryption_keys WHERE tenant_id = $1 ORDER BY generation ASC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(KeyRow::into_record).collect()
    }

    async fn max_generation(&self, tenant_id: &str) -> Result<i64, StoreError> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(generation), 0) FROM encryption_keys WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn update_status(&self, id: Uuid, status: KeyStatus) -> Result<(), StoreError> {
        sqlx::query("UPDATE encryption_keys SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// SQLSTATE 23505 (unique violation) becomes [`StoreError::Conflict`];
/// everything else stays an I/O failure.
fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict;
        }
    }
    StoreError::Database(e)
}
