//! Wire-level error body and the closed set of error codes.
//!
//! Every non-2xx response carries an [`ErrorBody`] whose `code` is one of the
//! constants in [`code`]. The CLI matches on these codes to pick exit codes,
//! so they are part of the public contract and must not be renamed.

use serde::{Deserialize, Serialize};

/// Machine-readable error codes returned in [`ErrorBody::code`].
pub mod code {
    /// The tenant path parameter does not match `^[A-Za-z0-9_-]{1,64}$`.
    pub const INVALID_TENANT_ID: &str = "INVALID_TENANT_ID";
    /// The generation path parameter is not an integer >= 1.
    pub const INVALID_GENERATION: &str = "INVALID_GENERATION";
    /// No key (or no matching generation) exists for the tenant.
    pub const KEY_NOT_FOUND: &str = "KEY_NOT_FOUND";
    /// The tenant already has a generation-1 key.
    pub const KEY_ALREADY_EXISTS: &str = "KEY_ALREADY_EXISTS";
    /// The requested generation exists but has been disabled.
    pub const KEY_DISABLED: &str = "KEY_DISABLED";
    /// The generation was already disabled by an earlier call.
    pub const KEY_ALREADY_DISABLED: &str = "KEY_ALREADY_DISABLED";
    /// A concurrent writer won the unique-constraint race; retry at the caller.
    pub const CONFLICT: &str = "CONFLICT";
    /// KMS, database, or other infrastructure failure. The message is fixed.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short machine-readable error code from [`code`].
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorBody {
    /// Construct an [`ErrorBody`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_new() {
        let e = ErrorBody::new(code::KEY_NOT_FOUND, "no key for tenant");
        assert_eq!(e.code, "KEY_NOT_FOUND");
        assert!(e.message.contains("no key"));
    }

    #[test]
    fn error_body_round_trip() {
        let e = ErrorBody::new(code::INVALID_TENANT_ID, "bad tenant");
        let json = serde_json::to_string(&e).unwrap();
        let decoded: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.code, e.code);
        assert_eq!(decoded.message, e.message);
    }
}
