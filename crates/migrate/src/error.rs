//! Errors produced by the migration engine and store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from migration discovery, application, and history tracking.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A file in the migrations directory does not match
    /// `{version}_{description}.sql`.
    #[error("invalid migration file name: {0}")]
    InvalidMigrationFile(String),

    /// The migrations directory or one of its files could not be read.
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration's statement batch or history insert failed. The
    /// transaction for `version` was rolled back; earlier migrations in the
    /// same run remain committed.
    #[error("migration {version} failed")]
    MigrationFailed {
        version: String,
        #[source]
        source: sqlx::Error,
    },

    /// A history query outside any single migration's transaction failed.
    #[error("migration store query failed")]
    Database(#[from] sqlx::Error),
}
