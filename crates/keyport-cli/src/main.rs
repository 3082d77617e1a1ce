//! keyport CLI.
//!
//! Offline operations over local files: entropy classification of seed
//! phrase lengths, keyring inspection and migration, and previews of the
//! asset migration batch. Nothing here talks to a chain.

mod commands;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use keyport_types::config::MigrationConfig;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// keyport: keyring vault versioning and asset migration.
#[derive(Parser)]
#[command(name = "keyport", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Path to a JSON migration config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify seed phrase word counts by entropy strength.
    Entropy(commands::entropy::EntropyArgs),
    /// Inspect and migrate keyring files.
    Vault {
        #[command(subcommand)]
        action: commands::vault::VaultAction,
    },
    /// Preview the batch moving a holdings snapshot to a new address.
    Plan(commands::plan::PlanArgs),
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub config: MigrationConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    // Logs go to stderr so JSON output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = load_config(cli.config.as_deref())
        .and_then(|config| dispatch(GlobalOpts { json, config }, cli.command));

    if let Err(e) = result {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> std::result::Result<MigrationConfig, String> {
    match path {
        Some(path) => MigrationConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(MigrationConfig::default()),
    }
}

fn dispatch(opts: GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Entropy(args) => commands::entropy::run(args, &opts),
        Commands::Vault { action } => commands::vault::run(action, &opts),
        Commands::Plan(args) => commands::plan::run(args, &opts),
    }
}
