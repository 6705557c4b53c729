//! Extractor options file
//!
//! `yt-dlp.json` in the configuration directory carries the recognized
//! extractor options. The file is created with defaults on first use, and
//! fields missing from an existing file fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::constants::extractor;
use crate::errors::{ConfigError, ConfigResult};

/// Recognized extractor options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// Format selector used for video requests
    pub format: String,
    /// Output naming template; always replaced by the cache destination
    pub outtmpl: String,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            format: extractor::DEFAULT_VIDEO_FORMAT.to_string(),
            outtmpl: extractor::DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }
}

impl ExtractorOptions {
    /// Load the options file, creating it with defaults if absent
    pub async fn load_or_init(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Self::write_default(path).await;
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let options: ExtractorOptions =
            serde_json::from_str(&content).map_err(|source| ConfigError::InvalidOptions {
                path: path.to_path_buf(),
                source,
            })?;

        if options.format.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "format".to_string(),
                value: options.format,
                reason: "Format selector must not be empty".to_string(),
            });
        }

        debug!("Loaded extractor options from {}", path.display());
        Ok(options)
    }

    async fn write_default(path: &Path) -> ConfigResult<Self> {
        let options = Self::default();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(&options).map_err(|source| {
            ConfigError::InvalidOptions {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, content).await.map_err(io_error)?;

        info!("Created default extractor options: {}", path.display());
        Ok(options)
    }
}
