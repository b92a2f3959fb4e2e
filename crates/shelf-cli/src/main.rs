//! Shelf CLI - track your home library from the command line.
//!
//! Works with or without connectivity: reads come from the local cache,
//! writes that cannot reach the server are queued and replayed by
//! `shelf sync`.

mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::CliConfig;
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shelf=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::resolve(cli.server, cli.token, cli.db_path)?;

    match cli.command {
        Commands::Add {
            name,
            author,
            pages,
            published,
            unavailable,
        } => {
            commands::save::run_add(
                &name,
                &author,
                pages,
                published.as_deref(),
                unavailable,
                &config,
            )
            .await?;
        }
        Commands::List { refresh, json } => {
            commands::list::run_list(refresh, json, &config).await?;
        }
        Commands::Edit {
            id,
            name,
            author,
            pages,
            published,
            available,
        } => {
            commands::save::run_edit(
                &id,
                name.as_deref(),
                author.as_deref(),
                pages,
                published.as_deref(),
                available,
                &config,
            )
            .await?;
        }
        Commands::Pending { json } => {
            commands::pending::run_pending(json, &config)?;
        }
        Commands::Sync => {
            commands::sync::run_sync(&config).await?;
        }
        Commands::Watch => {
            commands::watch::run_watch(&config).await?;
        }
        Commands::Conflicts { json } => {
            commands::conflicts::run_conflicts(json, &config).await?;
        }
        Commands::Resolve { id, keep } => {
            commands::conflicts::run_resolve(&id, keep.into(), &config).await?;
        }
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
