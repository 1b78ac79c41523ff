//! History tracking: which migration versions have been applied, and when.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::MigrateError;

/// One row of `schema_migrations`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub version: String,
    pub applied_at: DateTime<Utc>,
}

/// Reads and writes the `schema_migrations` history table.
#[derive(Clone)]
pub struct MigrationStore {
    pool: PgPool,
}

impl MigrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the history table if it does not exist yet.
    ///
    /// The table cannot itself be shipped as a migration file (recording its
    /// own creation would be circular), so the engine bootstraps it here.
    pub async fn ensure_schema(&self) -> Result<(), MigrateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version    TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every applied migration, ordered by version ascending.
    pub async fn list_applied(&self) -> Result<Vec<AppliedMigration>, MigrateError> {
        let rows = sqlx::query_as::<_, AppliedMigration>(
            "SELECT version, applied_at FROM schema_migrations ORDER BY version ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether `version` has already been recorded.
    pub async fn is_applied(&self, version: &str) -> Result<bool, MigrateError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT version FROM schema_migrations WHERE version = $1")
                .bind(version)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Record `version` inside the caller's transaction.
    ///
    /// Fails on a duplicate version: the primary key makes re-recording a
    /// hard error rather than a silent overwrite.
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        version: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
