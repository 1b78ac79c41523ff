//! Common wire types and error codes shared across `key-management-service` crates.

pub mod error;
pub mod protocol;

pub use error::ErrorBody;
pub use protocol::{KeyListResponse, KeyMetadata, KeyPayload, KeyStatus};
