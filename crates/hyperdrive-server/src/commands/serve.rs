use anyhow::{Context, Result};
use hyperdrive::Gallery;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Settings;
use crate::page;
use crate::routes::{self, AppState};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

/// Render the landing page and serve until interrupted.
pub async fn run(settings: &Settings, gallery: Gallery) -> Result<()> {
    let page = page::build(settings)?;
    info!(page = %page.display(), "landing page ready");

    let app = routes::router(settings, AppState::new(gallery));

    let listener = TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?;

    info!(
        name = %settings.name,
        mode = %settings.mode,
        address = %listener.local_addr()?,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}
