mod commands;
mod config;
mod logging;
mod page;
mod routes;
mod wiring;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_CONFIG_FILE, Settings};

#[derive(Parser)]
#[command(name = "hyperdrive-server")]
#[command(about = "Serve a Google Drive folder as a self-refreshing image gallery")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
    /// Render the landing page and start the HTTP server
    #[default]
    Serve,
    /// Reconcile the image cache once and print the asset list
    Refresh,
    /// Prune the image cache once and print what was removed
    Clean,
    /// Validate the configuration and print the resolved settings
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("invalid configuration in {}", cli.config.display()))?;

    logging::init(settings.verbose, settings.mode)?;

    tracing::info!(name = %settings.name, mode = %settings.mode, "starting");
    if settings.verbose {
        tracing::debug!(settings = %serde_json::to_string_pretty(&settings)?, "resolved configuration");
    }

    match cli.command.unwrap_or_default() {
        Command::Serve => commands::serve::run(&settings, wiring::gallery(&settings)?).await,
        Command::Refresh => commands::refresh::run(&wiring::gallery(&settings)?).await,
        Command::Clean => commands::clean::run(&wiring::gallery(&settings)?).await,
        Command::Check => commands::check::run(&settings),
    }
}
