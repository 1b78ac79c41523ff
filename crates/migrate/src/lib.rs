//! Schema migrations for `key-management-service`.
//!
//! # Model
//!
//! Migrations are plain SQL files named `{version}_{description}.sql`, applied
//! in lexicographic version order. Each file runs as a single statement batch
//! inside its own transaction, and the history row in `schema_migrations` is
//! inserted in that same transaction, so a migration is either fully applied
//! and recorded, or not applied at all.
//!
//! A run stops at the first failure, reporting the failing version. Files
//! committed before the failure stay committed.

pub mod engine;
pub mod error;
pub mod source;
pub mod store;

pub use engine::{MigrationStatus, Migrator};
pub use error::MigrateError;
pub use source::MigrationFile;
pub use store::{AppliedMigration, MigrationStore};
