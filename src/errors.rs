//! Error types for the media cache service
//!
//! This module defines the error types for all components of the service.
//! Errors are designed to be actionable: each carries enough detail to be
//! shown to an HTTP client verbatim, and the top-level [`AppError`] knows
//! which status code it maps to.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors
///
/// These are fatal for the request that hits them and are never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid TOML configuration
    #[error("Invalid configuration format in {path}: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid extractor options JSON
    #[error("Invalid extractor options in {path}: {source}")]
    InvalidOptions {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// The media-processing binary has no build for this host
    #[error("Unsupported platform for ffmpeg: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// I/O error reading or writing configuration
    #[error("Configuration I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while acquiring a media file through the external tool
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Request URL can never be handed to the extraction tool
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP request failed while fetching the ffmpeg archive
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status while fetching the ffmpeg archive
    #[error("Server error while fetching {url}: HTTP {status}")]
    ServerError { url: String, status: u16 },

    /// Archive extraction failed
    #[error("Failed to extract ffmpeg archive: {detail}")]
    Extraction { detail: String },

    /// The archive did not contain the expected binary
    #[error("FFmpeg binary not found in the extracted files")]
    BinaryMissing,

    /// Extraction tool executable could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Extraction tool exited unsuccessfully
    #[error("{program} failed ({status}): {detail}")]
    ToolFailed {
        program: String,
        status: String,
        detail: String,
    },

    /// Acquisition exceeded the configured timeout
    #[error("Acquisition timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Configuration problem surfaced during acquisition
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cache slot and cache directory errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Resident file could not be removed
    #[error("Failed to remove cached file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP server lifecycle errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server terminated with an I/O error
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Acquisition error
    #[error(transparent)]
    Acquisition(AcquisitionError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Server error
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Acquisition reported success but produced no output
    #[error("{detail}")]
    NotFound { detail: String },

    /// Request body could not be read as a download request
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

// Configuration problems keep their own category even when they surface
// from inside the acquisition adapter.
impl From<AcquisitionError> for AppError {
    fn from(error: AcquisitionError) -> Self {
        match error {
            AcquisitionError::Config(config) => AppError::Config(config),
            other => AppError::Acquisition(other),
        }
    }
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "configuration",
            AppError::Acquisition(_) => "acquisition",
            AppError::Cache(_) => "cache",
            AppError::Server(_) => "server",
            AppError::NotFound { .. } => "not_found",
            AppError::InvalidRequest { .. } => "invalid_request",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }

    /// HTTP status code this error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::InvalidRequest { .. } => 422,
            _ => 500,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Acquisition result type alias
pub type AcquisitionResult<T> = std::result::Result<T, AcquisitionError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;
