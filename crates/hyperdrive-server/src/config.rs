use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hyperdrive::{ReconcileOptions, RetryPolicy};
use hyperdrive_gdrive::google_drive::DEFAULT_API_BASE_URL;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "hyperdrive.toml";

/// URL path the static folder is always mounted under.
pub const STATIC_MOUNT: &str = "/static";

const DEFAULT_BODY: &str = "Welcome to Hyperdrive! To get started, please check out the README and specify your Google Drive folder ID.";
const DEFAULT_LOADING: &str = "Loading the latest and greatest, one moment please...";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no such {what}: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    #[error("{what} must be located in {folder}")]
    OutsideFolder { what: &'static str, folder: PathBuf },

    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Dev,
    Prod,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Mode::Dev),
            "prod" => Ok(Mode::Prod),
            _ => Err(ConfigError::Invalid {
                field: "mode",
                reason: format!("must be one of 'dev', 'prod' (found '{s}')"),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Dev => f.write_str("DEV"),
            Mode::Prod => f.write_str("PROD"),
        }
    }
}

/// Page colors, each a `#RRGGBB` hex code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Colors {
    pub main_background: String,
    pub caption_background: String,
    pub main_text: String,
    pub caption_text: String,
    pub loading_text: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            main_background: "#2F242C".into(),
            caption_background: "#FCFCFC".into(),
            main_text: "#FCFCFC".into(),
            caption_text: "#000000".into(),
            loading_text: "#808080".into(),
        }
    }
}

impl Colors {
    /// `(key, value)` pairs, keyed as they appear in templates.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("main_background", self.main_background.as_str()),
            ("caption_background", self.caption_background.as_str()),
            ("main_text", self.main_text.as_str()),
            ("caption_text", self.caption_text.as_str()),
            ("loading_text", self.loading_text.as_str()),
        ]
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value
            .strip_prefix('#')
            .is_some_and(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// External programs used for media conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub magick: String,
    pub ffmpeg: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            magick: hyperdrive_convert::magick::DEFAULT_MAGICK.into(),
            ffmpeg: hyperdrive_convert::ffmpeg::DEFAULT_FFMPEG.into(),
        }
    }
}

/// The config file as written. Paths are still relative here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub name: String,
    pub body: String,
    pub loading: String,
    pub verbose: bool,
    pub mode: Option<String>,
    pub host: String,
    pub port: u16,
    pub captions: bool,
    pub drive_folder_id: Option<String>,
    pub refresh_endpoint: String,
    pub clean_endpoint: String,
    pub image_endpoint: String,
    pub credentials_file: PathBuf,
    pub public_assets_folder: PathBuf,
    pub public_images_folder: PathBuf,
    pub template_folder: PathBuf,
    pub static_folder: PathBuf,
    pub landing_page: PathBuf,
    pub stylesheet: Option<PathBuf>,
    pub favicon: PathBuf,
    pub colors: Colors,
    pub download_attempts: u32,
    pub download_concurrency: usize,
    pub convert: ConvertConfig,
    pub drive_api_url: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            name: "Hyperdrive".into(),
            body: DEFAULT_BODY.into(),
            loading: DEFAULT_LOADING.into(),
            verbose: false,
            mode: None,
            host: "0.0.0.0".into(),
            port: 80,
            captions: false,
            drive_folder_id: None,
            refresh_endpoint: "/refresh".into(),
            clean_endpoint: "/clean".into(),
            image_endpoint: "/images".into(),
            credentials_file: "credentials.json".into(),
            public_assets_folder: "public".into(),
            public_images_folder: "images".into(),
            template_folder: "templates".into(),
            static_folder: "static".into(),
            landing_page: "index.html".into(),
            stylesheet: None,
            favicon: "favicon.png".into(),
            colors: Colors::default(),
            download_attempts: hyperdrive::download::DEFAULT_MAX_ATTEMPTS,
            download_concurrency: 1,
            convert: ConvertConfig::default(),
            drive_api_url: DEFAULT_API_BASE_URL.into(),
        }
    }
}

/// Validated settings with absolute paths.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub name: String,
    pub body: String,
    pub loading: String,
    pub verbose: bool,
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    pub captions: bool,
    pub drive_folder_id: String,
    pub refresh_endpoint: String,
    pub clean_endpoint: String,
    pub image_endpoint: String,
    pub credentials_file: PathBuf,
    pub public_assets_folder: PathBuf,
    pub public_images_folder: PathBuf,
    pub template_folder: PathBuf,
    pub static_folder: PathBuf,
    pub landing_page: PathBuf,
    pub stylesheet: Option<PathBuf>,
    pub favicon: PathBuf,
    pub colors: Colors,
    pub download_attempts: u32,
    pub download_concurrency: usize,
    pub convert: ConvertConfig,
    pub drive_api_url: String,
}

impl Settings {
    /// Read, parse and validate the config file at `path`.
    ///
    /// Relative paths inside the file resolve against the file's directory.
    /// Missing asset folders are created.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let absolute = std::path::absolute(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = absolute.parent().unwrap_or(Path::new("/"));

        file.resolve(base)
    }

    /// Served URL prefix of the image cache, without slashes.
    pub fn image_prefix(&self) -> &str {
        self.image_endpoint.trim_matches('/')
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            retry: RetryPolicy::new(self.download_attempts),
            download_concurrency: self.download_concurrency,
            captions: self.captions,
            path_prefix: self.image_prefix().to_owned(),
        }
    }
}

impl FileConfig {
    pub fn resolve(self, base: &Path) -> Result<Settings, ConfigError> {
        let mode: Mode = self.mode.as_deref().ok_or(ConfigError::Missing("mode"))?.parse()?;

        let drive_folder_id = self
            .drive_folder_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::Missing("drive_folder_id"))?;

        check_endpoint("refresh_endpoint", &self.refresh_endpoint)?;
        check_endpoint("clean_endpoint", &self.clean_endpoint)?;
        check_endpoint("image_endpoint", &self.image_endpoint)?;
        if self.image_endpoint == "/" {
            return Err(ConfigError::Invalid {
                field: "image_endpoint",
                reason: "cannot be the site root".into(),
            });
        }
        if self.refresh_endpoint == self.clean_endpoint
            || self.refresh_endpoint == self.image_endpoint
            || self.clean_endpoint == self.image_endpoint
        {
            return Err(ConfigError::Invalid {
                field: "refresh_endpoint",
                reason: "refresh, clean and image endpoints must all differ".into(),
            });
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: "cannot be empty".into(),
            });
        }

        for (key, value) in self.colors.entries() {
            if !is_hex_color(value) {
                return Err(ConfigError::Invalid {
                    field: "colors",
                    reason: format!("{key} = '{value}' is not a 6 digit hex code starting with '#'"),
                });
            }
        }

        if self.download_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "download_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.download_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "download_concurrency",
                reason: "must be at least 1".into(),
            });
        }
        if self.drive_api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "drive_api_url",
                reason: "cannot be empty".into(),
            });
        }

        let credentials_file = base.join(&self.credentials_file);
        require_file("credentials file", &credentials_file)?;

        let public_assets_folder = ensure_dir(base.join(&self.public_assets_folder))?;
        let public_images_folder = ensure_dir(base.join(&self.public_images_folder))?;
        let template_folder = ensure_dir(base.join(&self.template_folder))?;
        let static_folder = ensure_dir(base.join(&self.static_folder))?;

        let landing_page = file_within("landing page", &template_folder, &self.landing_page)?;
        let stylesheet = self
            .stylesheet
            .as_deref()
            .map(|sheet| file_within("stylesheet", &static_folder, sheet))
            .transpose()?;
        let favicon = file_within("favicon", &static_folder, &self.favicon)?;

        Ok(Settings {
            name: self.name,
            body: self.body,
            loading: self.loading,
            verbose: self.verbose,
            mode,
            host: self.host,
            port: self.port,
            captions: self.captions,
            drive_folder_id,
            refresh_endpoint: self.refresh_endpoint,
            clean_endpoint: self.clean_endpoint,
            image_endpoint: self.image_endpoint,
            credentials_file,
            public_assets_folder,
            public_images_folder,
            template_folder,
            static_folder,
            landing_page,
            stylesheet,
            favicon,
            colors: self.colors,
            download_attempts: self.download_attempts,
            download_concurrency: self.download_concurrency,
            convert: self.convert,
            drive_api_url: self.drive_api_url,
        })
    }
}

fn check_endpoint(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("must start with '/' (found '{value}')"),
        });
    }

    let under_static = value
        .strip_prefix(STATIC_MOUNT)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    if under_static {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("'{value}' collides with the {STATIC_MOUNT} mount"),
        });
    }
    Ok(())
}

fn require_file(what: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::NotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(&path).map_err(|source| ConfigError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Resolve `file` against `folder` and require that it exists inside it.
fn file_within(what: &'static str, folder: &Path, file: &Path) -> Result<PathBuf, ConfigError> {
    let path = folder.join(file);
    require_file(what, &path)?;

    let not_found = || ConfigError::NotFound {
        what,
        path: path.clone(),
    };
    let real_folder = folder.canonicalize().map_err(|_| not_found())?;
    let real_file = path.canonicalize().map_err(|_| not_found())?;

    if !real_file.starts_with(&real_folder) {
        return Err(ConfigError::OutsideFolder {
            what,
            folder: folder.to_path_buf(),
        });
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A directory holding everything a minimal config needs.
    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("credentials.json"), "{}").unwrap();
        std::fs::create_dir_all(dir.path().join("templates")).unwrap();
        std::fs::write(dir.path().join("templates/index.html"), "<html></html>").unwrap();
        std::fs::create_dir_all(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/favicon.png"), b"png").unwrap();
        dir
    }

    fn load(dir: &tempfile::TempDir, toml_str: &str) -> Result<Settings, ConfigError> {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, toml_str).unwrap();
        Settings::load(&path)
    }

    const MINIMAL: &str = r#"
mode = "dev"
drive_folder_id = "folder-1"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = site();
        let settings = load(&dir, MINIMAL).unwrap();

        assert_eq!(settings.name, "Hyperdrive");
        assert_eq!(settings.mode, Mode::Dev);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 80);
        assert!(!settings.captions);
        assert_eq!(settings.refresh_endpoint, "/refresh");
        assert_eq!(settings.clean_endpoint, "/clean");
        assert_eq!(settings.image_endpoint, "/images");
        assert_eq!(settings.colors, Colors::default());
        assert_eq!(settings.download_attempts, 3);
        assert_eq!(settings.download_concurrency, 1);
        assert_eq!(settings.convert.magick, "magick");
        assert_eq!(settings.convert.ffmpeg, "ffmpeg");
        assert!(settings.stylesheet.is_none());
    }

    #[test]
    fn relative_paths_resolve_against_config_directory() {
        let dir = site();
        let settings = load(&dir, MINIMAL).unwrap();

        assert_eq!(settings.credentials_file, dir.path().join("credentials.json"));
        assert_eq!(settings.landing_page, dir.path().join("templates/index.html"));
        assert_eq!(settings.favicon, dir.path().join("static/favicon.png"));
        assert_eq!(settings.public_images_folder, dir.path().join("images"));
    }

    #[test]
    fn missing_folders_are_created() {
        let dir = site();
        load(&dir, MINIMAL).unwrap();

        assert!(dir.path().join("public").is_dir());
        assert!(dir.path().join("images").is_dir());
    }

    #[test]
    fn mode_is_required_and_case_insensitive() {
        let dir = site();

        let err = load(&dir, r#"drive_folder_id = "f""#).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("mode")));

        let settings = load(&dir, "mode = \"PROD\"\ndrive_folder_id = \"f\"").unwrap();
        assert_eq!(settings.mode, Mode::Prod);

        let err = load(&dir, "mode = \"staging\"\ndrive_folder_id = \"f\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "mode", .. }));
    }

    #[test]
    fn folder_id_is_required() {
        let dir = site();

        let err = load(&dir, r#"mode = "dev""#).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("drive_folder_id")));

        let err = load(&dir, "mode = \"dev\"\ndrive_folder_id = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("drive_folder_id")));
    }

    #[test]
    fn endpoints_must_start_with_slash() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}refresh_endpoint = \"refresh\"")).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { field: "refresh_endpoint", .. }));
    }

    #[test]
    fn endpoints_must_differ() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}clean_endpoint = \"/refresh\"")).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn endpoints_cannot_shadow_static_mount() {
        let dir = site();
        for (field, value) in [
            ("image_endpoint", "/static"),
            ("refresh_endpoint", "/static/refresh"),
            ("clean_endpoint", "/static/"),
        ] {
            let err = load(&dir, &format!("{MINIMAL}{field} = \"{value}\"")).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { field: f, .. } if f == field),
                "{field} = {value} gave {err:?}"
            );
        }
    }

    #[test]
    fn endpoint_sharing_static_prefix_is_allowed() {
        let dir = site();
        let settings = load(&dir, &format!("{MINIMAL}image_endpoint = \"/statics\"")).unwrap();

        assert_eq!(settings.image_endpoint, "/statics");
    }

    #[test]
    fn invalid_color_is_rejected() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}[colors]\nmain_text = \"#FFF\"")).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { field: "colors", .. }));
    }

    #[test]
    fn partial_colors_keep_other_defaults() {
        let dir = site();
        let settings = load(&dir, &format!("{MINIMAL}[colors]\nmain_text = \"#123abc\"")).unwrap();

        assert_eq!(settings.colors.main_text, "#123abc");
        assert_eq!(settings.colors.loading_text, "#808080");
    }

    #[test]
    fn missing_credentials_file_is_rejected() {
        let dir = site();
        std::fs::remove_file(dir.path().join("credentials.json")).unwrap();

        let err = load(&dir, MINIMAL).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { what: "credentials file", .. }));
    }

    #[test]
    fn missing_landing_page_is_rejected() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}landing_page = \"home.html\"")).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound { what: "landing page", .. }));
    }

    #[test]
    fn landing_page_outside_template_folder_is_rejected() {
        let dir = site();
        std::fs::write(dir.path().join("elsewhere.html"), "x").unwrap();

        let err = load(&dir, &format!("{MINIMAL}landing_page = \"../elsewhere.html\"")).unwrap_err();
        assert!(matches!(err, ConfigError::OutsideFolder { what: "landing page", .. }));
    }

    #[test]
    fn stylesheet_must_exist_in_static_folder() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}stylesheet = \"site.css\"")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { what: "stylesheet", .. }));

        std::fs::write(dir.path().join("static/site.css"), "body {}").unwrap();
        let settings = load(&dir, &format!("{MINIMAL}stylesheet = \"site.css\"")).unwrap();
        assert_eq!(settings.stylesheet, Some(dir.path().join("static/site.css")));
    }

    #[test]
    fn zero_download_attempts_is_rejected() {
        let dir = site();
        let err = load(&dir, &format!("{MINIMAL}download_attempts = 0")).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { field: "download_attempts", .. }));
    }

    #[test]
    fn unreadable_file_is_read_error() {
        let err = Settings::load(Path::new("/nonexistent/hyperdrive.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = site();
        let err = load(&dir, "mode = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn reconcile_options_follow_settings() {
        let dir = site();
        let settings = load(
            &dir,
            &format!("{MINIMAL}captions = true\nimage_endpoint = \"/photos/\"\ndownload_attempts = 5\ndownload_concurrency = 4"),
        )
        .unwrap();

        let options = settings.reconcile_options();
        assert!(options.captions);
        assert_eq!(options.path_prefix, "photos");
        assert_eq!(options.retry.max_attempts(), 5);
        assert_eq!(options.download_concurrency, 4);
    }

    #[test]
    fn hex_color_check() {
        assert!(is_hex_color("#2F242C"));
        assert!(is_hex_color("#abcdef"));
        assert!(!is_hex_color("2F242C0"));
        assert!(!is_hex_color("#2F242"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}
