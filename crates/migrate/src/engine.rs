//! Applies pending migrations and reports per-file status.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::error::MigrateError;
use crate::source::{self, MigrationFile};
use crate::store::MigrationStore;

/// One on-disk migration annotated with its applied-or-pending state.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub version: String,
    pub description: String,
    /// `Some` when the version is recorded in `schema_migrations`.
    pub applied_at: Option<DateTime<Utc>>,
}

/// Discovers migration files and applies the unapplied ones in order.
#[derive(Clone)]
pub struct Migrator {
    pool: PgPool,
    dir: PathBuf,
    store: MigrationStore,
}

impl Migrator {
    pub fn new(pool: PgPool, dir: impl Into<PathBuf>) -> Self {
        let store = MigrationStore::new(pool.clone());
        Self {
            pool,
            dir: dir.into(),
            store,
        }
    }

    /// Connect to `database_url` with a small dedicated pool and build a
    /// [`Migrator`] over `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Database`] if the connection cannot be
    /// established.
    pub async fn connect(database_url: &str, dir: impl Into<PathBuf>) -> Result<Self, MigrateError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool, dir))
    }

    /// Apply every pending migration, in version order.
    ///
    /// Each file's statement batch and its history row commit in one
    /// transaction; the run aborts at the first failing version, leaving
    /// earlier commits in place. Returns the versions applied by this run;
    /// an empty list means the database was already up to date.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidMigrationFile`] before touching the
    /// database if any discovered name is malformed, and
    /// [`MigrateError::MigrationFailed`] naming the version whose
    /// transaction rolled back.
    pub async fn run(&self) -> Result<Vec<String>, MigrateError> {
        let files = source::discover(&self.dir)?;
        self.store.ensure_schema().await?;

        let applied: HashSet<String> = self
            .store
            .list_applied()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        let mut newly_applied = Vec::new();
        for file in &files {
            if applied.contains(&file.version) {
                debug!(version = %file.version, "migration already applied, skipping");
                continue;
            }
            self.apply_one(file).await?;
            info!(version = %file.version, description = %file.description, "migration applied");
            newly_applied.push(file.version.clone());
        }

        if newly_applied.is_empty() {
            debug!("no pending migrations");
        } else {
            info!(count = newly_applied.len(), "migration run complete");
        }
        Ok(newly_applied)
    }

    /// Every on-disk migration with its applied timestamp when present.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrateError> {
        let files = source::discover(&self.dir)?;
        self.store.ensure_schema().await?;

        let applied: HashMap<String, DateTime<Utc>> = self
            .store
            .list_applied()
            .await?
            .into_iter()
            .map(|m| (m.version, m.applied_at))
            .collect();

        Ok(files
            .into_iter()
            .map(|f| MigrationStatus {
                applied_at: applied.get(&f.version).copied(),
                version: f.version,
                description: f.description,
            })
            .collect())
    }

    /// Execute one file's statement batch and record its version, atomically.
    async fn apply_one(&self, file: &MigrationFile) -> Result<(), MigrateError> {
        let sql = std::fs::read_to_string(&file.path).map_err(|source| MigrateError::Io {
            path: file.path.clone(),
            source,
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| MigrateError::MigrationFailed {
                version: file.version.clone(),
                source,
            })?;

        // Raw (unprepared) execution: a migration file may contain several
        // statements separated by semicolons.
        (&mut *tx)
            .execute(sql.as_str())
            .await
            .map_err(|source| MigrateError::MigrationFailed {
                version: file.version.clone(),
                source,
            })?;

        MigrationStore::record(&mut tx, &file.version)
            .await
            .map_err(|source| MigrateError::MigrationFailed {
                version: file.version.clone(),
                source,
            })?;

        tx.commit()
            .await
            .map_err(|source| MigrateError::MigrationFailed {
                version: file.version.clone(),
                source,
            })
    }
}
