//! AWS KMS-backed implementation of [`KmsClient`].

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::primitives::Blob;

use super::{KmsClient, KmsError};

/// KMS client bound to a single key-encryption key.
///
/// The KEK resource name is fixed at construction and never supplied by
/// callers; every wrap and unwrap in the process goes through the same key,
/// which keeps the trust boundary auditable. The underlying SDK client is
/// cheaply cloneable and safe for concurrent use.
#[derive(Clone)]
pub struct AwsKms {
    client: aws_sdk_kms::Client,
    key_id: String,
}

impl AwsKms {
    /// Initialise the SDK client from the standard AWS credential chain and
    /// bind it to `key_id`.
    pub async fn init(key_id: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: aws_sdk_kms::Client::new(&config),
            key_id,
        }
    }
}

#[async_trait]
impl KmsClient for AwsKms {
    async fn wrap_dek(&self, plaintext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let resp = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(Blob::new(plaintext.to_vec()))
            .send()
            .await
            .map_err(|e| KmsError::Request(Box::new(e)))?;

        let blob = resp
            .ciphertext_blob()
            .ok_or_else(|| KmsError::Request("encrypt response contained no ciphertext".into()))?;
        Ok(blob.as_ref().to_vec())
    }

    async fn unwrap_dek(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KmsError> {
        let resp = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(Blob::new(ciphertext.to_vec()))
            .send()
            .await
            .map_err(|e| KmsError::Request(Box::new(e)))?;

        let blob = resp
            .plaintext()
            .ok_or_else(|| KmsError::Request("decrypt response contained no plaintext".into()))?;
        Ok(blob.as_ref().to_vec())
    }
}
