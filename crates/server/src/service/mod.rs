//! The key lifecycle engine.
//!
//! # Lifecycle
//!
//! - `create_key` bootstraps a tenant at generation 1.
//! - `rotate_key` appends generation N+1, leaving older generations usable
//!   for decryption until explicitly disabled.
//! - `disable_key` is the only mutation, and it is one-way.
//!
//! Concurrent creates and rotations are serialized by the store's unique
//! constraint on `(tenant_id, generation)`; there are no application-level
//! locks. The loser of a race gets [`KeyServiceError::AlreadyExists`] (create)
//! or [`KeyServiceError::Conflict`] (rotate) and retries at its own level.
//!
//! # Security invariants
//!
//! - Plaintext DEKs exist only inside a single call's scope, wrapped in
//!   [`PlaintextDek`] which zeroes itself on drop.
//! - Metadata paths (`create`, `rotate`, `list`) never unwrap key material.

pub mod dek;
pub mod error;

pub use dek::{PlaintextDek, DEK_LEN};
pub use error::KeyServiceError;

use std::sync::Arc;

use common::{KeyMetadata, KeyStatus};
use tracing::info;

use crate::kms::KmsClient;
use crate::store::{KeyRecord, KeyStore, NewKeyRecord, StoreError};

/// A decrypted DEK together with the generation it belongs to.
#[derive(Debug)]
pub struct KeyMaterial {
    pub tenant_id: String,
    pub generation: i64,
    pub dek: PlaintextDek,
}

/// Orchestrates the store and the KMS client; enforces all lifecycle rules.
///
/// Safe for concurrent use: both capabilities are shared immutable handles.
pub struct KeyService {
    store: Arc<dyn KeyStore>,
    kms: Arc<dyn KmsClient>,
}

impl KeyService {
    pub fn new(store: Arc<dyn KeyStore>, kms: Arc<dyn KmsClient>) -> Self {
        Self { store, kms }
    }

    /// Issue the tenant's first key at generation 1.
    ///
    /// # Errors
    ///
    /// [`KeyServiceError::AlreadyExists`] when the tenant is already
    /// bootstrapped, including when a concurrent create wins the insert race
    /// after the existence check passed.
    pub async fn create_key(&self, tenant_id: &str) -> Result<KeyMetadata, KeyServiceError> {
        if self
            .store
            .exists_for_tenant(tenant_id)
            .await
            .map_err(KeyServiceError::Store)?
        {
            return Err(KeyServiceError::AlreadyExists);
        }

        let record = self.wrap_and_insert(tenant_id, 1).await.map_err(|e| match e {
            KeyServiceError::Store(StoreError::Conflict) => KeyServiceError::AlreadyExists,
            other => other,
        })?;

        info!(tenant_id, "key created at generation 1");
        Ok(metadata(&record))
    }

    /// Decrypt and return the highest-generation `active` key.
    pub async fn get_current_key(&self, tenant_id: &str) -> Result<KeyMaterial, KeyServiceError> {
        let record = self
            .store
            .find_latest_active(tenant_id)
            .await
            .map_err(KeyServiceError::Store)?
            .ok_or(KeyServiceError::NotFound)?;
        self.unwrap_material(record).await
    }

    /// Decrypt and return one specific generation.
    ///
    /// # Errors
    ///
    /// [`KeyServiceError::Disabled`] when the generation exists but is no
    /// longer usable, distinct from [`KeyServiceError::NotFound`] so the
    /// caller learns the generation is real.
    pub async fn get_key_by_generation(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<KeyMaterial, KeyServiceError> {
        let record = self
            .store
            .find_by_tenant_and_generation(tenant_id, generation)
            .await
            .map_err(KeyServiceError::Store)?
            .ok_or(KeyServiceError::NotFound)?;
        if record.status == KeyStatus::Disabled {
            return Err(KeyServiceError::Disabled);
        }
        self.unwrap_material(record).await
    }

    /// Append a new generation at `max + 1`. Older generations (active ones
    /// included) are left untouched so previously encrypted data stays
    /// decryptable.
    ///
    /// # Errors
    ///
    /// [`KeyServiceError::NotFound`] when the tenant has no keys (rotation
    /// presupposes `create_key`); [`KeyServiceError::Conflict`] when a
    /// concurrent rotation claimed the generation first.
    pub async fn rotate_key(&self, tenant_id: &str) -> Result<KeyMetadata, KeyServiceError> {
        let max = self
            .store
            .max_generation(tenant_id)
            .await
            .map_err(KeyServiceError::Store)?;
        if max == 0 {
            return Err(KeyServiceError::NotFound);
        }

        let record = self
            .wrap_and_insert(tenant_id, max + 1)
            .await
            .map_err(|e| match e {
                KeyServiceError::Store(StoreError::Conflict) => KeyServiceError::Conflict,
                other => other,
            })?;

        info!(tenant_id, generation = record.generation, "key rotated");
        Ok(metadata(&record))
    }

    /// Metadata for every generation, ascending. Empty when the tenant has
    /// no keys. Never touches the KMS.
    pub async fn list_keys(&self, tenant_id: &str) -> Result<Vec<KeyMetadata>, KeyServiceError> {
        let records = self
            .store
            .find_all_by_tenant(tenant_id)
            .await
            .map_err(KeyServiceError::Store)?;
        Ok(records.iter().map(metadata).collect())
    }

    /// Mark one generation `disabled`, removing it from the decryption set.
    ///
    /// Not idempotent: disabling is an audited, rate-observable action, so a
    /// repeat call reports [`KeyServiceError::AlreadyDisabled`] instead of
    /// succeeding silently.
    pub async fn disable_key(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<(), KeyServiceError> {
        let record = self
            .store
            .find_by_tenant_and_generation(tenant_id, generation)
            .await
            .map_err(KeyServiceError::Store)?
            .ok_or(KeyServiceError::NotFound)?;
        if record.status == KeyStatus::Disabled {
            return Err(KeyServiceError::AlreadyDisabled);
        }

        self.store
            .update_status(record.id, KeyStatus::Disabled)
            .await
            .map_err(KeyServiceError::Store)?;

        info!(tenant_id, generation, "key generation disabled");
        Ok(())
    }

    /// Generate a fresh DEK, wrap it, and insert the record. The plaintext
    /// is dropped (and zeroed) before this function returns.
    async fn wrap_and_insert(
        &self,
        tenant_id: &str,
        generation: i64,
    ) -> Result<KeyRecord, KeyServiceError> {
        let plaintext = PlaintextDek::generate();
        let wrapped = self.kms.wrap_dek(plaintext.as_bytes()).await?;
        drop(plaintext);

        self.store
            .insert(NewKeyRecord {
                tenant_id: tenant_id.to_owned(),
                generation,
                wrapped_dek: wrapped,
            })
            .await
            .map_err(KeyServiceError::Store)
    }

    async fn unwrap_material(&self, record: KeyRecord) -> Result<KeyMaterial, KeyServiceError> {
        let plaintext = self.kms.unwrap_dek(&record.wrapped_dek).await?;
        let dek = PlaintextDek::try_from_slice(&plaintext)
            .map_err(|e| crate::kms::KmsError::InvalidKeyMaterial(e.0))?;
        Ok(KeyMaterial {
            tenant_id: record.tenant_id,
            generation: record.generation,
            dek,
        })
    }
}

fn metadata(record: &KeyRecord) -> KeyMetadata {
    KeyMetadata {
        tenant_id: record.tenant_id.clone(),
        generation: record.generation,
        status: record.status,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::kms::{KmsError, MockKmsClient};
    use crate::testutil::{FakeKms, InMemoryKeyStore};

    fn service() -> KeyService {
        KeyService::new(Arc::new(InMemoryKeyStore::new()), Arc::new(FakeKms))
    }

    fn service_over(store: Arc<dyn KeyStore>) -> KeyService {
        KeyService::new(store, Arc::new(FakeKms))
    }

    /// Simulates the create/rotate races: reads are stale, inserts hit the
    /// unique constraint of the shared inner store.
    struct StaleReadStore {
        inner: InMemoryKeyStore,
    }

    #[async_trait]
    impl KeyStore for StaleReadStore {
        async fn exists_for_tenant(&self, _tenant_id: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn insert(&self, new: NewKeyRecord) -> Result<KeyRecord, StoreError> {
            self.inner.insert(new).await
        }
        async fn find_by_tenant_and_generation(
            &self,
            tenant_id: &str,
            generation: i64,
        ) -> Result<Option<KeyRecord>, StoreError> {
            self.inner
                .find_by_tenant_and_generation(tenant_id, generation)
                .await
        }
        async fn find_latest_active(
            &self,
            tenant_id: &str,
        ) -> Result<Option<KeyRecord>, StoreError> {
            self.inner.find_latest_active(tenant_id).await
        }
        async fn find_all_by_tenant(&self, tenant_id: &str) -> Result<Vec<KeyRecord>, StoreError> {
            self.inner.find_all_by_tenant(tenant_id).await
        }
        async fn max_generation(&self, tenant_id: &str) -> Result<i64, StoreError> {
            Ok((self.inner.max_generation(tenant_id).await? - 1).max(0))
        }
        async fn update_status(&self, id: Uuid, status: common::KeyStatus) -> Result<(), StoreError> {
            self.inner.update_status(id, status).await
        }
    }

    #[tokio::test]
    async fn create_assigns_generation_one() {
        let svc = service();
        let meta = svc.create_key("tenant-001").await.unwrap();
        assert_eq!(meta.tenant_id, "tenant-001");
        assert_eq!(meta.generation, 1);
        assert_eq!(meta.status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn create_twice_reports_already_exists() {
        let svc = service();
        svc.create_key("tenant-001").await.unwrap();
        assert!(matches!(
            svc.create_key("tenant-001").await,
            Err(KeyServiceError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn create_race_loser_reports_already_exists() {
        let inner = InMemoryKeyStore::new();
        // A concurrent create already claimed generation 1.
        inner
            .insert(NewKeyRecord {
                tenant_id: "t".into(),
                generation: 1,
                wrapped_dek: b"wrapped:x".to_vec(),
            })
            .await
            .unwrap();
        let svc = service_over(Arc::new(StaleReadStore { inner }));
        assert!(matches!(
            svc.create_key("t").await,
            Err(KeyServiceError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn round_trip_returns_original_plaintext() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        let current = svc.get_current_key("t").await.unwrap();
        let by_generation = svc.get_key_by_generation("t", 1).await.unwrap();
        assert_eq!(current.dek.as_bytes(), by_generation.dek.as_bytes());
        assert_eq!(current.generation, 1);
        assert_eq!(current.dek.as_bytes().len(), DEK_LEN);
    }

    #[tokio::test]
    async fn get_current_without_key_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.get_current_key("nobody").await,
            Err(KeyServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rotation_increments_by_one() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        for expected in 2..=4 {
            let meta = svc.rotate_key("t").await.unwrap();
            assert_eq!(meta.generation, expected);
        }
        let current = svc.get_current_key("t").await.unwrap();
        assert_eq!(current.generation, 4);
    }

    #[tokio::test]
    async fn rotation_without_prior_key_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.rotate_key("unknown").await,
            Err(KeyServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rotation_race_loser_surfaces_conflict() {
        let inner = InMemoryKeyStore::new();
        for generation in 1..=2 {
            inner
                .insert(NewKeyRecord {
                    tenant_id: "t".into(),
                    generation,
                    wrapped_dek: b"wrapped:x".to_vec(),
                })
                .await
                .unwrap();
        }
        // The stale read observes max = 1 and tries to claim generation 2.
        let svc = service_over(Arc::new(StaleReadStore { inner }));
        assert!(matches!(
            svc.rotate_key("t").await,
            Err(KeyServiceError::Conflict)
        ));
    }

    #[tokio::test]
    async fn current_skips_disabled_generations() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        svc.rotate_key("t").await.unwrap();
        svc.disable_key("t", 2).await.unwrap();
        let current = svc.get_current_key("t").await.unwrap();
        assert_eq!(current.generation, 1);
    }

    #[tokio::test]
    async fn disabled_generation_is_not_retrievable() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        svc.rotate_key("t").await.unwrap();
        svc.disable_key("t", 2).await.unwrap();
        assert!(matches!(
            svc.get_key_by_generation("t", 2).await,
            Err(KeyServiceError::Disabled)
        ));
    }

    #[tokio::test]
    async fn disabling_one_generation_leaves_others_usable() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        let original = svc.get_key_by_generation("t", 1).await.unwrap();
        svc.rotate_key("t").await.unwrap();
        svc.disable_key("t", 2).await.unwrap();
        let still_there = svc.get_key_by_generation("t", 1).await.unwrap();
        assert_eq!(original.dek.as_bytes(), still_there.dek.as_bytes());
    }

    #[tokio::test]
    async fn disable_twice_reports_already_disabled() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        svc.disable_key("t", 1).await.unwrap();
        assert!(matches!(
            svc.disable_key("t", 1).await,
            Err(KeyServiceError::AlreadyDisabled)
        ));
    }

    #[tokio::test]
    async fn disable_unknown_generation_is_not_found() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        assert!(matches!(
            svc.disable_key("t", 9).await,
            Err(KeyServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_is_ordered_and_metadata_only() {
        let svc = service();
        svc.create_key("t").await.unwrap();
        svc.rotate_key("t").await.unwrap();
        svc.rotate_key("t").await.unwrap();
        svc.disable_key("t", 2).await.unwrap();

        let keys = svc.list_keys("t").await.unwrap();
        let generations: Vec<_> = keys.iter().map(|k| k.generation).collect();
        assert_eq!(generations, vec![1, 2, 3]);
        assert_eq!(keys[1].status, KeyStatus::Disabled);
        assert_eq!(keys[2].status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn list_for_unknown_tenant_is_empty() {
        let svc = service();
        assert!(svc.list_keys("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn kms_failure_propagates_from_create() {
        let mut kms = MockKmsClient::new();
        kms.expect_wrap_dek()
            .returning(|_| Err(KmsError::Request("kms unreachable".into())));
        let svc = KeyService::new(Arc::new(InMemoryKeyStore::new()), Arc::new(kms));
        assert!(matches!(
            svc.create_key("t").await,
            Err(KeyServiceError::Kms(_))
        ));
    }

    #[tokio::test]
    async fn truncated_kms_plaintext_is_an_error() {
        let mut kms = MockKmsClient::new();
        kms.expect_wrap_dek().returning(|pt| Ok(pt.to_vec()));
        kms.expect_unwrap_dek().returning(|_| Ok(vec![0u8; 16]));
        let svc = KeyService::new(Arc::new(InMemoryKeyStore::new()), Arc::new(kms));
        svc.create_key("t").await.unwrap();
        assert!(matches!(
            svc.get_current_key("t").await,
            Err(KeyServiceError::Kms(KmsError::InvalidKeyMaterial(16)))
        ));
    }
}
