//! Bootstrap configuration loading and data folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file at the default location is not an error; the service
//! logs a warning and starts on compiled defaults. A file that exists but
//! cannot be read or parsed is a configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "VINYL_DATA_DIR";

/// Lower/upper bound for the finished-track monitor interval
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; whatever is absent falls back to
/// [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Folder holding `library.json`, `static/` and the remote token cache
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Finished-track monitor interval in milliseconds
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Streaming-service credentials (optional; remote playback is disabled without them)
    #[serde(default)]
    pub spotify: Option<SpotifyConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Streaming-service account credentials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Long-lived refresh token obtained out of band
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Short-lived access token; refreshed automatically when it expires
    #[serde(default)]
    pub access_token: Option<String>,
    /// Web API base URL override (tests, proxies)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Accounts service base URL override
    #[serde(default)]
    pub accounts_base: Option<String>,
}

impl SpotifyConfig {
    /// True when the config carries enough to obtain an access token
    pub fn has_credentials(&self) -> bool {
        let refreshable = self.client_id.is_some()
            && self.client_secret.is_some()
            && self.refresh_token.is_some();
        refreshable || self.access_token.is_some()
    }
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from an explicit path, or from the platform default location
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file yields an empty config.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "No config file at {}, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Platform default config file: `<config_dir>/vinyl/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vinyl").join("config.toml"))
}

/// Compiled-in fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: dirs::data_local_dir()
                .map(|d| d.join("vinyl"))
                .unwrap_or_else(|| PathBuf::from("./app_data")),
            poll_interval_ms: 1000,
            log_level: default_log_level(),
        }
    }
}

/// Resolve the data folder
///
/// Priority: command-line argument, then `VINYL_DATA_DIR`, then the TOML
/// value, then the compiled default.
pub fn resolve_data_dir(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    CompiledDefaults::for_current_platform().data_dir
}

/// Clamp a monitor interval into the supported range
pub fn clamp_poll_interval_ms(value: u64) -> u64 {
    value.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}
