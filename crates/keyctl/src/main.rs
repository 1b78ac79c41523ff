//! `keyctl` — CLI for operating a key-management-service deployment.
//!
//! Key lifecycle commands are thin wrappers over the HTTP API; the
//! `migrate` subcommands talk to the database directly, since migrations
//! are applied before (or independently of) a running server.
//!
//! Exit codes: 0 success, 1 generic failure, 2 argument error (clap),
//! 3 transport failure, 4 authentication failure.

mod api;
mod cli;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use api::ApiClient;
use cli::{Cli, Command, MigrateAction, MigrateArgs, OutputFormat};

#[tokio::main]
async fn main() {
    // Argument errors exit with code 2 via clap before we get here.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    std::process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    let format = cli.output;
    match cli.command {
        Command::Create { tenant } => {
            with_client(&cli.api_url, cli.timeout, |client| async move {
                let meta = client.create(&tenant).await?;
                Ok(output::format_metadata(&meta, format))
            })
            .await
        }
        Command::Get { tenant, generation } => {
            with_client(&cli.api_url, cli.timeout, |client| async move {
                let payload = match generation {
                    Some(generation) => client.get_generation(&tenant, generation).await?,
                    None => client.get_current(&tenant).await?,
                };
                Ok(output::format_payload(&payload, format))
            })
            .await
        }
        Command::Rotate { tenant } => {
            with_client(&cli.api_url, cli.timeout, |client| async move {
                let meta = client.rotate(&tenant).await?;
                Ok(output::format_metadata(&meta, format))
            })
            .await
        }
        Command::List { tenant } => {
            with_client(&cli.api_url, cli.timeout, |client| async move {
                let list = client.list(&tenant).await?;
                Ok(output::format_list(&list, format))
            })
            .await
        }
        Command::Disable { tenant, generation } => {
            with_client(&cli.api_url, cli.timeout, |client| async move {
                client.disable(&tenant, generation).await?;
                Ok(output::format_disabled(&tenant, generation, format))
            })
            .await
        }
        Command::Migrate { action } => match action {
            MigrateAction::Up(args) => migrate_up(args, format).await,
            MigrateAction::Status(args) => migrate_status(args, format).await,
        },
        Command::Version => {
            println!("keyctl {}", env!("CARGO_PKG_VERSION"));
            0
        }
    }
}

/// Run one API call and print its output, translating errors to exit codes.
async fn with_client<F, Fut>(api_url: &str, timeout_secs: u64, call: F) -> i32
where
    F: FnOnce(ApiClient) -> Fut,
    Fut: std::future::Future<Output = Result<String, api::ApiError>>,
{
    let client = match ApiClient::new(api_url, Duration::from_secs(timeout_secs)) {
        Ok(c) => c,
        Err(e) => return fail(&e.to_string(), e.exit_code()),
    };
    match call(client).await {
        Ok(out) => {
            println!("{out}");
            0
        }
        Err(e) => {
            let code = e.exit_code();
            fail(&e.to_string(), code)
        }
    }
}

async fn migrate_up(args: MigrateArgs, format: OutputFormat) -> i32 {
    let migrator = match migrate::Migrator::connect(&args.database_url, args.migrations_dir).await {
        Ok(m) => m,
        Err(e) => return fail(&format!("migrate: {e}"), 1),
    };
    match migrator.run().await {
        Ok(applied) => {
            println!("{}", output::format_migrate_run(&applied, format));
            0
        }
        Err(e) => fail(&format!("migrate: {e}"), 1),
    }
}

async fn migrate_status(args: MigrateArgs, format: OutputFormat) -> i32 {
    let migrator = match migrate::Migrator::connect(&args.database_url, args.migrations_dir).await {
        Ok(m) => m,
        Err(e) => return fail(&format!("migrate: {e}"), 1),
    };
    match migrator.status().await {
        Ok(statuses) => {
            println!("{}", output::format_migrate_status(&statuses, format));
            0
        }
        Err(e) => fail(&format!("migrate: {e}"), 1),
    }
}

fn fail(message: &str, code: i32) -> i32 {
    eprintln!("error: {message}");
    code
}
