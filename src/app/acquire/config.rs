//! Acquisition configuration and HTTP client building
//!
//! This module holds the runtime settings for the extraction tool and the
//! ffmpeg installer, and builds the HTTP client used to fetch the ffmpeg
//! archive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{extractor, ffmpeg, http, paths};
use crate::errors::{AcquisitionError, AcquisitionResult};

/// Settings for acquiring media through the extraction tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Directory holding the ffmpeg binary and the extractor options file
    pub config_dir: PathBuf,
    /// Extraction tool executable (name on `PATH` or absolute path)
    pub program: String,
    /// Upper bound on a single acquisition (None = wait indefinitely)
    pub timeout: Option<Duration>,
    /// Release base URL for the ffmpeg archives
    pub ffmpeg_builds_url: String,
    /// Connect timeout for the ffmpeg archive download
    pub connect_timeout: Duration,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(paths::DEFAULT_CONFIG_DIR),
            program: extractor::PROGRAM.to_string(),
            timeout: None,
            ffmpeg_builds_url: ffmpeg::BUILDS_URL.to_string(),
            connect_timeout: http::CONNECT_TIMEOUT,
        }
    }
}

impl AcquireConfig {
    /// Create a configuration rooted at `config_dir`
    pub fn with_config_dir(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            ..Default::default()
        }
    }

    /// Set the extraction tool executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the acquisition timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the installed ffmpeg binary
    pub fn ffmpeg_path(&self) -> PathBuf {
        self.config_dir.join(ffmpeg::BINARY_NAME)
    }

    /// Path of the extractor options file
    pub fn options_path(&self) -> PathBuf {
        self.config_dir.join(paths::EXTRACTOR_OPTIONS_FILE)
    }

    /// Builds the HTTP client used for the ffmpeg archive download
    ///
    /// No overall request timeout is set: the archive is large and its
    /// download time depends on the link.
    pub fn build_http_client(&self) -> AcquisitionResult<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .build()
            .map_err(AcquisitionError::Http)
    }
}
