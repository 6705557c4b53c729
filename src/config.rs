//! Configuration management for the media cache
//!
//! Settings come from four layers, later ones winning: built-in defaults,
//! the TOML file (`<config dir>/media-cache.toml` or an explicit `--config`
//! path), environment variables, and command-line flags. The last two are
//! resolved by clap and applied on top of the loaded file by the CLI.
//!
//! On first run a commented default file is written into the configuration
//! directory so operators have something to edit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{AcquireConfig, CacheConfig};
use crate::constants::{cache, extractor, ffmpeg, http, logging, paths};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings
    pub server: ServerConfigToml,
    /// Cache slot settings
    pub cache: CacheConfigToml,
    /// Extraction tool settings
    pub extractor: ExtractorConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfigToml {
    /// Listen address, `host:port`
    pub bind: String,
    /// Longest wait for in-flight requests once shutdown starts
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfigToml {
    fn default() -> Self {
        Self {
            bind: http::DEFAULT_BIND_ADDR.to_string(),
            shutdown_timeout: http::SHUTDOWN_TIMEOUT,
        }
    }
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    pub video_dir: PathBuf,
    pub audio_dir: PathBuf,
    /// Idle time before the resident is evicted, e.g. "15m"
    #[serde(with = "humantime_serde")]
    pub idle_threshold: Duration,
    /// Time between expiry sweeps, e.g. "60s"
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from(paths::DEFAULT_VIDEO_CACHE_DIR),
            audio_dir: PathBuf::from(paths::DEFAULT_AUDIO_CACHE_DIR),
            idle_threshold: cache::IDLE_THRESHOLD,
            sweep_interval: cache::SWEEP_INTERVAL,
        }
    }
}

/// TOML-friendly extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfigToml {
    /// Extraction tool executable
    pub program: String,
    /// Upper bound on one acquisition; absent means no limit
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Release base URL for the ffmpeg archives
    pub ffmpeg_builds_url: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for ExtractorConfigToml {
    fn default() -> Self {
        Self {
            program: extractor::PROGRAM.to_string(),
            timeout: None,
            ffmpeg_builds_url: ffmpeg::BUILDS_URL.to_string(),
            connect_timeout: http::CONNECT_TIMEOUT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicit `config_file_override` must exist. Otherwise the file in
    /// `config_dir` is used when present, and defaults when it is not.
    pub async fn load(
        config_file_override: Option<PathBuf>,
        config_dir: &Path,
    ) -> ConfigResult<Self> {
        let path = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => path,
            None => Self::default_config_path(config_dir),
        };

        let config = if path.exists() {
            Self::load_from_file(&path).await?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration file if none exists yet
    ///
    /// Returns the path of the configuration file.
    pub async fn initialize_first_run(config_dir: &Path) -> ConfigResult<PathBuf> {
        let config_path = Self::default_config_path(config_dir);
        if config_path.exists() {
            return Ok(config_path);
        }

        tokio::fs::create_dir_all(config_dir)
            .await
            .map_err(|source| ConfigError::Io {
                path: config_dir.to_path_buf(),
                source,
            })?;
        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        info!("Created default configuration file: {}", config_path.display());
        Ok(config_path)
    }

    /// Path of the service configuration file inside `config_dir`
    pub fn default_config_path(config_dir: &Path) -> PathBuf {
        config_dir.join(paths::SERVICE_CONFIG_FILE)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.bind.trim().is_empty() {
            return Err(invalid("server.bind", "", "Listen address must not be empty"));
        }
        if self.cache.sweep_interval.is_zero() {
            return Err(invalid(
                "cache.sweep_interval",
                "0s",
                "Sweep interval must be positive",
            ));
        }
        if self.extractor.program.trim().is_empty() {
            return Err(invalid(
                "extractor.program",
                "",
                "Extraction tool must be set",
            ));
        }
        if self.extractor.timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid(
                "extractor.timeout",
                "0s",
                "Omit the timeout instead of setting it to zero",
            ));
        }
        Ok(())
    }

    /// Runtime cache configuration
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            video_dir: self.cache.video_dir.clone(),
            audio_dir: self.cache.audio_dir.clone(),
            idle_threshold: self.cache.idle_threshold,
            sweep_interval: self.cache.sweep_interval,
        }
    }

    /// Runtime acquisition configuration rooted at `config_dir`
    pub fn acquire_config(&self, config_dir: &Path) -> AcquireConfig {
        AcquireConfig {
            config_dir: config_dir.to_path_buf(),
            program: self.extractor.program.clone(),
            timeout: self.extractor.timeout,
            ffmpeg_builds_url: self.extractor.ffmpeg_builds_url.clone(),
            connect_timeout: self.extractor.connect_timeout,
        }
    }

    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Default configuration file content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Media cache configuration
# This file was generated on first run. Command-line flags and environment
# variables override anything set here.

[server]
# Listen address (env {bind_env})
bind = "{bind}"
# On shutdown, stop waiting for unfinished requests after this long
shutdown_timeout = "{drain}"

[cache]
# One resident file per kind lives in each directory.
# Both directories are created at startup and removed at shutdown.
video_dir = "{video_dir}"
audio_dir = "{audio_dir}"

# A resident idle for longer than this is evicted
idle_threshold = "{idle}"
# How often idle residents are checked
sweep_interval = "{sweep}"

[extractor]
program = "{program}"
# Kill an acquisition that runs longer than this (default: no limit)
# timeout = "10m"
ffmpeg_builds_url = "{builds_url}"
connect_timeout = "{connect}"

[logging]
level = "{level}"  # error, warn, info, debug, trace
"#,
            bind_env = crate::constants::env::BIND_ADDR,
            bind = http::DEFAULT_BIND_ADDR,
            drain = humantime_serde::re::humantime::format_duration(http::SHUTDOWN_TIMEOUT),
            video_dir = paths::DEFAULT_VIDEO_CACHE_DIR,
            audio_dir = paths::DEFAULT_AUDIO_CACHE_DIR,
            idle = humantime_serde::re::humantime::format_duration(cache::IDLE_THRESHOLD),
            sweep = humantime_serde::re::humantime::format_duration(cache::SWEEP_INTERVAL),
            program = extractor::PROGRAM,
            builds_url = ffmpeg::BUILDS_URL,
            connect = humantime_serde::re::humantime::format_duration(http::CONNECT_TIMEOUT),
            level = logging::DEFAULT_LOG_LEVEL,
        )
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
