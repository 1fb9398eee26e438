//! vinyl-player runtime configuration
//!
//! Resolved once at startup. Priority, highest first:
//! 1. Command-line arguments (clap also reads `VINYL_*` environment variables)
//! 2. TOML bootstrap file
//! 3. Compiled defaults

use std::path::{Path, PathBuf};
use std::time::Duration;
use vinyl_common::config::{clamp_poll_interval_ms, resolve_data_dir, CompiledDefaults, SpotifyConfig, TomlConfig};

/// Outbound event buffer per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Values given on the command line (or via their environment variables)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub audio_device: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Natural-finish poll interval, clamped to 250–5000 ms
    pub poll_interval: Duration,
    /// Output device name; `None` uses the system default
    pub audio_device: Option<String>,
    pub log_level: String,
    pub spotify: SpotifyConfig,
    pub event_capacity: usize,
}

impl Config {
    pub fn resolve(overrides: Overrides, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let poll_ms = overrides
            .poll_interval_ms
            .or(toml.poll_interval_ms)
            .unwrap_or(defaults.poll_interval_ms);

        Self {
            host: overrides.host.or(toml.host).unwrap_or(defaults.host),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            data_dir: resolve_data_dir(overrides.data_dir.as_deref(), toml.data_dir.as_deref()),
            poll_interval: Duration::from_millis(clamp_poll_interval_ms(poll_ms)),
            audio_device: overrides.audio_device,
            log_level: toml.logging.level,
            spotify: toml.spotify.unwrap_or_default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Compiled defaults rooted at `data_dir`
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::resolve(
            Overrides {
                data_dir: Some(data_dir.to_path_buf()),
                ..Default::default()
            },
            TomlConfig::default(),
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.data_dir.join("static")
    }

    pub fn library_path(&self) -> PathBuf {
        self.data_dir.join(crate::catalog::LIBRARY_FILE)
    }

    /// Front-end debug settings served verbatim at `/api/config`
    pub fn debug_config_path(&self) -> PathBuf {
        self.data_dir.join("debug_config.json")
    }
}
