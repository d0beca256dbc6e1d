use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Mode;

const CRATES: [&str; 4] = [
    "hyperdrive",
    "hyperdrive_gdrive",
    "hyperdrive_convert",
    "hyperdrive_server",
];

/// Filter used when `RUST_LOG` is unset.
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives = vec!["info".to_owned()];
    directives.extend(CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

/// Install the global subscriber: human-readable lines in dev, JSON in prod.
pub fn init(verbose: bool, mode: Mode) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match mode {
        Mode::Dev => registry.with(fmt::layer().with_target(verbose)).try_init(),
        Mode::Prod => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    installed.context("failed to install log subscriber")
}
