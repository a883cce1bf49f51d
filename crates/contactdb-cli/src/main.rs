//! contactdb CLI - merge duplicate contacts and reconcile registry imports
//!
//! Every command opens the local database, runs one engine operation and
//! prints a short summary (or JSON with `--json`).

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{load_config, log_filter, open_service, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::import::{import_config, run_import};
use crate::commands::merge::run_merge;
use crate::commands::resolve::{run_accept, run_keep_both, run_keep_old, run_resolve_all};
use crate::commands::show::run_show;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.clone())?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(&config)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }
    if let Commands::Import { fail_fast, .. } = &cli.command {
        config = import_config(config, *fail_fast);
    }

    let db_path = resolve_db_path(cli.db_path, &config)?;
    let service = open_service(&db_path, &config).await?;

    match cli.command {
        Commands::Merge {
            survivor,
            losers,
            json,
        } => run_merge(&service, &survivor, &losers, json).await?,
        Commands::Show { contact, json } => run_show(&service, &contact, json).await?,
        Commands::Conflicts {
            contact,
            limit,
            json,
        } => run_conflicts(&service, contact.as_deref(), limit, json).await?,
        Commands::Accept { conflict } => run_accept(&service, &conflict).await?,
        Commands::KeepOld { conflict } => run_keep_old(&service, &conflict).await?,
        Commands::KeepBoth {
            conflict,
            registry,
            json,
        } => run_keep_both(&service, &conflict, registry.as_deref(), json).await?,
        Commands::ResolveAll { policy, json } => run_resolve_all(&service, policy, json).await?,
        Commands::Import { file, json, .. } => {
            run_import(&service, &file, json).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
