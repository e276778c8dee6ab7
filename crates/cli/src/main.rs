//! viewsync CLI - bucket connection checks and view reconciliation
//!
//! This binary provides the command-line interface for the viewsync system.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use viewsync::{check_bucket, load_config, provision, reconcile_views, BucketAction};
use viewsync_storage::RestConnector;

#[derive(Parser)]
#[command(name = "viewsync")]
#[command(about = "Keep a bucket's views in sync with configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the configured bucket and report whether it is reachable
    Check,
    /// Create or update the configured design document
    Reconcile,
    /// Provision buckets on a development cluster
    #[command(subcommand)]
    Bucket(BucketCommands),
}

#[derive(Subcommand)]
enum BucketCommands {
    /// Create the `default` bucket
    CreateDefault,
    /// Delete the `default` bucket
    DeleteDefault,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let Some(command) = cli.command else {
        println!("Run 'viewsync reconcile' to sync views, or --help for more options");
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    let connector = Arc::new(RestConnector::from_config(&config.cluster));

    match command {
        Commands::Check => check_bucket(&config, connector).await,
        Commands::Reconcile => {
            let outcome = reconcile_views(&config, connector).await?;
            println!("{outcome}");
            Ok(())
        }
        Commands::Bucket(bucket_cmd) => {
            let action = match bucket_cmd {
                BucketCommands::CreateDefault => BucketAction::CreateDefault,
                BucketCommands::DeleteDefault => BucketAction::DeleteDefault,
            };
            let response = provision(&config, action).await?;
            info!("Management API answered {}", response.status);
            println!("{} {}", response.status, response.body);
            Ok(())
        }
    }
}

/// Initialize logging system
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "viewsync_core={level},viewsync_storage={level},{}={level}",
            env!("CARGO_PKG_NAME")
        ))
        .init();

    Ok(())
}
