//! Media acquisition
//!
//! Acquisition turns a source URL into a media file at a destination chosen
//! by the cache. The [`Acquirer`] trait is the seam between the request flow
//! and the outside world; [`YtDlpAcquirer`] is the production implementation
//! and tests substitute their own.
//!
//! # Module Organization
//!
//! - [`config`] - Tool, timeout and installer settings
//! - [`options`] - The `yt-dlp.json` options file
//! - [`ffmpeg`] - One-time ffmpeg installation
//! - [`ytdlp`] - Child-process runner for the extraction tool
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use media_cache::app::acquire::{AcquireConfig, Acquirer, YtDlpAcquirer};
//! use media_cache::app::MediaKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let acquirer = YtDlpAcquirer::new(AcquireConfig::default())?;
//! let path = acquirer
//!     .acquire("https://example.com/watch?v=1", MediaKind::Audio, Path::new("/tmp/a.mp3"))
//!     .await?;
//! println!("written to {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::app::media::MediaKind;
use crate::errors::AcquisitionResult;

pub mod config;
pub mod ffmpeg;
pub mod options;
pub mod ytdlp;

pub use config::AcquireConfig;
pub use ffmpeg::FfmpegInstaller;
pub use options::ExtractorOptions;
pub use ytdlp::{validate_url, YtDlpAcquirer};

/// Produces a media file for a URL
///
/// On success the returned path is `destination` and the file exists. On
/// failure the implementation may leave partial files behind; the caller
/// removes them.
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Acquire `url` as `kind` into `destination`
    async fn acquire(
        &self,
        url: &str,
        kind: MediaKind,
        destination: &Path,
    ) -> AcquisitionResult<PathBuf>;
}
