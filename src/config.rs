use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calendar::LocalCalendar;
use crate::provider::{ContentMode, DeliveryMode, Error, ErrorKind, Result, ThumbnailRequest};

const CONFIG_PATH_ENV_VAR: &str = "PICTOCAL_CONFIG_FILE";

pub(crate) fn find_configfile_locations() -> Result<Vec<PathBuf>> {
    let config_env = env::var(CONFIG_PATH_ENV_VAR).ok().map(PathBuf::from);

    let home = dirs::home_dir().ok_or_else(|| {
        Error::new(
            ErrorKind::ConfigParse,
            "Unable to find home directory",
        )
    })?;

    let home_config = home.join(".pictocal.toml");

    let config_xdg = dirs::config_dir()
        .unwrap_or_else(|| home.join(".config"))
        .join("pictocal")
        .join("config.toml");

    let mut locations = vec![config_xdg, home_config];

    if let Some(path) = config_env {
        locations.insert(0, path);
    }

    Ok(locations)
}

fn default_library_path() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("Pictures"))
}

fn expand_home(path: PathBuf) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    pub path: PathBuf,
    pub create_missing: bool,
    pub extensions: Vec<String>,
    /// Date files without EXIF capture time by their modification time.
    pub mtime_fallback: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            path: default_library_path(),
            create_missing: false,
            extensions: ["jpg", "jpeg", "png", "heic", "gif", "webp", "tiff", "bmp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            mtime_fallback: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub size: u32,
    pub content_mode: ContentMode,
    pub quality: DeliveryMode,
    pub network_allowed: bool,
    /// Number of threads decoding thumbnails.
    pub workers: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        let request = ThumbnailRequest::default();
        ThumbnailConfig {
            size: request.width,
            content_mode: request.content_mode,
            quality: request.delivery_mode,
            network_allowed: request.network_allowed,
            workers: 4,
        }
    }
}

impl ThumbnailConfig {
    pub fn request(&self) -> ThumbnailRequest {
        ThumbnailRequest {
            width: self.size,
            height: self.size,
            content_mode: self.content_mode,
            delivery_mode: self.quality,
            network_allowed: self.network_allowed,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "tick_rate_ms", deserialize_with = "de_millis")]
    pub tick_rate: Duration,
    pub library: LibraryConfig,
    pub calendar: LocalCalendar,
    pub thumbnail: ThumbnailConfig,
}

fn de_millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

impl Default for Config {
    fn default() -> Config {
        Config {
            tick_rate: Duration::from_millis(500),
            library: LibraryConfig::default(),
            calendar: LocalCalendar::default(),
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.library.path = expand_home(config.library.path);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::new(
                ErrorKind::ConfigParse,
                &format!("Could not read '{}': {}", path.display(), e),
            )
        })?;
        Self::from_toml(&content)
    }
}

/// Loads `path` if given, otherwise the first existing file of the default
/// locations. Falls back to the built-in defaults.
pub fn load_suitable_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        log::info!("Loading configuration from '{}'", path.display());
        return Config::from_file(path);
    }

    for location in find_configfile_locations()? {
        if location.is_file() {
            log::info!("Loading configuration from '{}'", location.display());
            return Config::from_file(&location);
        }
    }

    log::info!("No configuration file found, using defaults");
    Ok(Config::default())
}
