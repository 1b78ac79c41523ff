//! [`PlaintextDek`]: short-lived buffer for decrypted key material.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Byte length of a data-encryption key (AES-256, 32 bytes).
pub const DEK_LEN: usize = 32;

/// Unwrapped key material has an unexpected length.
#[derive(Debug, Error)]
#[error("DEK has invalid length: expected {DEK_LEN} bytes, got {0}")]
pub struct InvalidDekLength(pub usize);

/// Fixed-size buffer holding exactly [`DEK_LEN`] plaintext bytes.
///
/// Lives only on the stack of the producing or consuming call path; it is
/// never stored in a struct that outlives the request, never serialised,
/// and never logged. When this type is dropped, the memory is overwritten
/// with zeroes to minimise the window during which plaintext key material
/// lives in RAM.
pub struct PlaintextDek(Box<[u8; DEK_LEN]>);

impl PlaintextDek {
    /// Generate a fresh DEK from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; DEK_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    /// Take ownership of unwrapped key material.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDekLength`] if `bytes` is not exactly [`DEK_LEN`] long.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, InvalidDekLength> {
        if bytes.len() != DEK_LEN {
            return Err(InvalidDekLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; DEK_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Borrow the raw key bytes for wrapping or wire encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for PlaintextDek {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for PlaintextDek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("PlaintextDek([REDACTED])")
    }
}
