//! Command-line definitions for `keyctl`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Rendering mode for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Machine-parseable JSON.
    Json,
}

/// Operate a key-management-service deployment.
#[derive(Debug, Parser)]
#[command(name = "keyctl", version, about = "Key-management service CLI")]
pub struct Cli {
    /// Base URL of the key-management API.
    #[arg(
        long,
        global = true,
        env = "KEYCTL_API_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub api_url: String,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30, value_name = "SECONDS")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the tenant's first key (generation 1).
    Create {
        /// Tenant identifier.
        #[arg(long)]
        tenant: String,
    },

    /// Retrieve a decrypted key: the current one, or a specific generation.
    Get {
        #[arg(long)]
        tenant: String,
        /// Specific generation to retrieve; defaults to the current key.
        #[arg(long)]
        generation: Option<i64>,
    },

    /// Rotate the tenant's key to a new generation.
    Rotate {
        #[arg(long)]
        tenant: String,
    },

    /// List every key generation's metadata.
    List {
        #[arg(long)]
        tenant: String,
    },

    /// Disable one key generation.
    Disable {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        generation: i64,
    },

    /// Schema migration management (talks to the database directly).
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Print the keyctl version.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum MigrateAction {
    /// Apply all pending migrations.
    Up(MigrateArgs),
    /// Show applied/pending state for every on-disk migration.
    Status(MigrateArgs),
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Database connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Directory containing `{version}_{description}.sql` files.
    #[arg(long, env = "MIGRATIONS_DIR", default_value = "./migrations")]
    pub migrations_dir: String,
}
