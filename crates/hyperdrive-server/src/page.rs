use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Settings;

/// File name of the rendered landing page inside the public assets folder.
pub const INDEX_FILE: &str = "index.html";

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Substitute every `{{hyperdrive-*}}` placeholder in `template`.
pub fn render(template: &str, settings: &Settings) -> String {
    let stylesheet = settings
        .stylesheet
        .as_deref()
        .map(|sheet| format!(r#"<link rel="stylesheet" href="static/{}">"#, file_name(sheet)))
        .unwrap_or_default();

    let mut page = template
        .replace("{{hyperdrive-title}}", &settings.name)
        .replace("{{hyperdrive-body}}", &settings.body)
        .replace("{{hyperdrive-loading}}", &settings.loading)
        .replace("{{hyperdrive-favicon}}", &file_name(&settings.favicon))
        .replace("{{hyperdrive-stylesheet}}", &stylesheet);

    for (key, value) in settings.colors.entries() {
        page = page.replace(&format!("{{{{hyperdrive-color-{key}}}}}"), value);
    }

    page
}

/// Render the landing page into the public assets folder.
pub fn build(settings: &Settings) -> Result<PathBuf> {
    let template = std::fs::read_to_string(&settings.landing_page).with_context(|| {
        format!(
            "failed to read landing page: {}",
            settings.landing_page.display()
        )
    })?;

    let target = settings.public_assets_folder.join(INDEX_FILE);
    std::fs::write(&target, render(&template, settings))
        .with_context(|| format!("failed to write page: {}", target.display()))?;

    tracing::debug!(page = %target.display(), "rendered landing page");
    Ok(target)
}
