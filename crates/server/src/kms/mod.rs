//! KMS wrap/unwrap of data-encryption keys.
//!
//! The service never performs envelope cryptography itself: wrapping and
//! unwrapping happen inside the external KMS under a single key-encryption
//! key fixed at client construction. Handlers and the key service consume
//! the [`KmsClient`] capability trait; production binds [`AwsKms`].

pub mod client;

pub use client::AwsKms;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by the KMS layer.
#[derive(Debug, Error)]
pub enum KmsError {
    /// Transport, authentication, or authorization failure from the KMS.
    #[error("KMS request failed")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The KMS returned plaintext of a length other than the DEK size.
    #[error("KMS returned key material of unexpected length: {0} bytes")]
    InvalidKeyMaterial(usize),
}

/// Capability consumed by [`crate::service::KeyService`]: wrap and unwrap a
/// fixed-size DEK against the deployment's KEK.
///
/// Implementations must be safe for concurrent use; the caller never names
/// the KEK.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KmsClient: Send + Sync {
    /// Encrypt `plaintext` under the bound KEK, returning the ciphertext blob.
    async fn wrap_dek(&self, plaintext: &[u8]) -> Result<Vec<u8>, KmsError>;

    /// Decrypt a ciphertext blob previously produced by [`Self::wrap_dek`].
    async fn unwrap_dek(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError>;
}
