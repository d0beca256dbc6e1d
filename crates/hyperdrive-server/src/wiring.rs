use std::sync::Arc;

use anyhow::{Context, Result};
use hyperdrive::{CacheDir, FolderId, Gallery};
use hyperdrive_convert::Tool;
use hyperdrive_gdrive::{GoogleDrive, GoogleDriveConfig, ServiceAccountKey, ServiceAccountTokens};

use crate::config::Settings;

/// Assemble the gallery described by `settings`: Google Drive behind
/// service-account auth, command-line converters, and the image cache.
pub fn gallery(settings: &Settings) -> Result<Gallery> {
    let key = ServiceAccountKey::from_file(&settings.credentials_file)
        .context("failed to load Google credentials")?;
    let tokens = ServiceAccountTokens::new(key).context("failed to load Google credentials")?;
    tracing::debug!(account = tokens.client_email(), "using service account");

    let drive = GoogleDrive::new(GoogleDriveConfig {
        api_base_url: Some(settings.drive_api_url.clone()),
        token_source: Arc::new(tokens),
    });

    let converters = hyperdrive_convert::command_line(
        Tool::new(&settings.convert.magick),
        Tool::new(&settings.convert.ffmpeg),
    );

    Ok(Gallery::new(
        Arc::new(drive),
        FolderId::new(&settings.drive_folder_id),
        CacheDir::new(&settings.public_images_folder),
        converters,
        settings.reconcile_options(),
    ))
}
