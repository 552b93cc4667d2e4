//! Persistent configuration model, defaults and file handling.

use std::path::{Path, PathBuf};

use log::{info, warn};

const CONFIG_DIR_NAME: &str = "watchlog";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_LOG_FILE_NAME: &str = "entertainment.txt";
const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Catalog service connection settings.
    pub catalog: CatalogConfig,
    #[serde(default)]
    /// Enrichment cache location.
    pub cache: CacheConfig,
    #[serde(default)]
    /// Watch-log input location.
    pub input: InputConfig,
    #[serde(default)]
    /// Optional Plex library import.
    pub plex: PlexConfig,
}

/// TMDb connection settings.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CacheConfig {
    /// Cache document path. Falls back to the user cache directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct InputConfig {
    /// Watch-log path. Falls back to `entertainment.txt` in the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlexConfig {
    /// Path to `com.plexapp.plugins.library.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_db_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            language: default_language(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_read_timeout_secs() -> u64 {
    15
}

impl Config {
    /// Effective watch-log path.
    pub fn log_path(&self) -> PathBuf {
        self.input
            .log_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_NAME))
    }

    /// Effective cache document path.
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(crate::cache_store::default_cache_path)
    }
}

/// Default config location under the user's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Clamps values that would make the catalog client unusable.
pub fn sanitize_config(mut config: Config) -> Config {
    config.catalog.api_key = config.catalog.api_key.trim().to_string();
    config.catalog.base_url = config.catalog.base_url.trim().trim_end_matches('/').to_string();
    if config.catalog.base_url.is_empty() {
        config.catalog.base_url = default_base_url();
    }
    config.catalog.connect_timeout_secs = config.catalog.connect_timeout_secs.max(1);
    config.catalog.read_timeout_secs = config.catalog.read_timeout_secs.max(1);
    config
}

/// Fills an empty API key from `env_api_key` (normally `TMDB_API_KEY`).
pub fn apply_api_key_override(mut config: Config, env_api_key: Option<String>) -> Config {
    if config.catalog.api_key.is_empty() {
        if let Some(key) = env_api_key.map(|key| key.trim().to_string()) {
            if !key.is_empty() {
                config.catalog.api_key = key;
            }
        }
    }
    config
}

/// Writes a default config file when `path` does not exist yet.
pub fn ensure_config_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    info!(
        "Config file not found. Creating default config. path={}",
        path.display()
    );
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| {
                format!("failed to create config dir {}: {}", parent.display(), err)
            })?;
        }
    }
    let text = toml::to_string(&Config::default())
        .map_err(|err| format!("failed to serialize default config: {}", err))?;
    std::fs::write(path, text)
        .map_err(|err| format!("failed to write config {}: {}", path.display(), err))
}

/// Loads `path`, falling back to defaults when it cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            Config::default()
        }
    }
}

/// Loads the effective configuration: file (created when missing), sanitization, env override.
pub fn load_effective_config(path: &Path) -> Config {
    if let Err(err) = ensure_config_file(path) {
        warn!("{}", err);
    }
    let config = sanitize_config(load_config_file(path));
    apply_api_key_override(config, std::env::var(TMDB_API_KEY_ENV).ok())
}
