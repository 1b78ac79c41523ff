//! The key-service error taxonomy.
//!
//! Domain outcomes are a closed sum matched exhaustively by the HTTP layer;
//! infrastructure failures wrap their causes and are reported to callers
//! only as a generic internal error.

use thiserror::Error;

use crate::kms::KmsError;
use crate::store::StoreError;

/// Errors returned by [`crate::service::KeyService`].
#[derive(Debug, Error)]
pub enum KeyServiceError {
    // --- domain ---
    /// No key (or no matching generation) exists for the tenant.
    #[error("key not found")]
    NotFound,

    /// The tenant already has a key; `create` bootstraps exactly once.
    #[error("key already exists")]
    AlreadyExists,

    /// The requested generation exists but has been disabled.
    #[error("key generation is disabled")]
    Disabled,

    /// The generation was already disabled by an earlier call.
    #[error("key generation is already disabled")]
    AlreadyDisabled,

    /// A concurrent rotation won the generation race; retry at the caller.
    #[error("concurrent key rotation conflict")]
    Conflict,

    // --- infrastructure ---
    /// Wrap or unwrap failed at the external KMS.
    #[error("kms operation failed")]
    Kms(#[from] KmsError),

    /// The key store failed with an I/O or schema error.
    #[error("key store operation failed")]
    Store(StoreError),
}

impl KeyServiceError {
    /// Whether this is an expected domain outcome (logged at warn) rather
    /// than an infrastructure failure (logged at error with its chain).
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            KeyServiceError::NotFound
                | KeyServiceError::AlreadyExists
                | KeyServiceError::Disabled
                | KeyServiceError::AlreadyDisabled
                | KeyServiceError::Conflict
        )
    }
}
