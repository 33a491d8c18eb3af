//! # configs
//!
//! Layered settings: built-in defaults, then an optional TOML file, then
//! `FORUM__SECTION__KEY` environment variables (a `.env` file is loaded
//! first if present).

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "config/forum.toml";
const ENV_PREFIX: &str = "FORUM";
const MIB: i64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub uploads: UploadSettings,
    pub catalog: CatalogSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub avatar_max_bytes: u64,
    pub content_max_bytes: u64,
    /// Directory the local object store writes into
    pub root_dir: String,
    /// Prefix prepended to object keys to form public URLs
    pub public_url_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogSettings {
    pub base_url: String,
    pub page_size: usize,
    #[serde(default)]
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// JSON lines instead of human-readable output
    pub json: bool,
}

impl Settings {
    /// Loads from [`DEFAULT_CONFIG_FILE`] (if it exists) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let settings: Settings = config::Config::builder()
            .set_default("uploads.avatar_max_bytes", 5 * MIB)?
            .set_default("uploads.content_max_bytes", 10 * MIB)?
            .set_default("uploads.root_dir", "./data/uploads")?
            .set_default("uploads.public_url_prefix", "/static/uploads")?
            .set_default("catalog.base_url", "https://api.modrinth.com")?
            .set_default("catalog.page_size", 20_i64)?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.avatar_max_bytes == 0 || self.uploads.content_max_bytes == 0 {
            return Err(ConfigError::Invalid("upload limits must be positive".into()));
        }
        if self.catalog.page_size == 0 {
            return Err(ConfigError::Invalid("catalog.page_size must be positive".into()));
        }
        Ok(())
    }
}
