//! One-time installation of the media-processing binary
//!
//! The extraction tool needs ffmpeg to merge and transcode streams. The
//! binary is fetched once from the static-build release matching the host
//! OS/architecture, extracted with the system `tar`, made executable and
//! cached in the configuration directory. Later calls reuse it as-is.
//!
//! Installation writes to a temporary file in the configuration directory and
//! renames it into place, so two concurrent installs at worst download twice.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::constants::ffmpeg;
use crate::errors::{AcquisitionError, AcquisitionResult, ConfigError, ConfigResult};

use super::config::AcquireConfig;

/// Archive name for an OS/architecture pair
///
/// Supported pairs are linux/x86_64 and linux/aarch64. Anything else is a
/// configuration error and is never retried.
pub fn archive_name(os: &str, arch: &str) -> ConfigResult<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Ok(ffmpeg::LINUX_X86_64_ARCHIVE),
        ("linux", "aarch64") | ("linux", "arm64") => Ok(ffmpeg::LINUX_AARCH64_ARCHIVE),
        _ => Err(ConfigError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

/// Archive name for the running host
pub fn host_archive_name() -> ConfigResult<&'static str> {
    archive_name(std::env::consts::OS, std::env::consts::ARCH)
}

/// Downloads and caches the ffmpeg binary
#[derive(Debug, Clone)]
pub struct FfmpegInstaller {
    binary_path: PathBuf,
    builds_url: String,
    client: Client,
}

impl FfmpegInstaller {
    /// Create an installer for the configured directory
    pub fn new(config: &AcquireConfig) -> AcquisitionResult<Self> {
        Ok(Self {
            binary_path: config.ffmpeg_path(),
            builds_url: config.ffmpeg_builds_url.trim_end_matches('/').to_string(),
            client: config.build_http_client()?,
        })
    }

    /// Path the binary is installed at
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Return the binary path, installing the binary first if needed
    pub async fn ensure_installed(&self) -> AcquisitionResult<PathBuf> {
        if self.binary_path.exists() {
            debug!("Reusing ffmpeg at {}", self.binary_path.display());
            return Ok(self.binary_path.clone());
        }

        let archive = host_archive_name()?;
        let url = format!("{}/{}", self.builds_url, archive);
        info!("Installing ffmpeg from {}", url);

        let install_dir = self
            .binary_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&install_dir).await?;

        let work_dir = tempfile::tempdir()?;
        let archive_path = work_dir.path().join("ffmpeg.archive");

        self.download(&url, &archive_path).await?;
        extract(&archive_path, work_dir.path()).await?;

        let extracted = find_binary(work_dir.path())
            .await?
            .ok_or(AcquisitionError::BinaryMissing)?;

        // Stage next to the destination so the final rename is atomic.
        let staged = tempfile::Builder::new()
            .prefix(".ffmpeg-")
            .tempfile_in(&install_dir)?;
        fs::copy(&extracted, staged.path()).await?;
        make_executable(staged.path()).await?;
        staged
            .persist(&self.binary_path)
            .map_err(|e| AcquisitionError::Io(e.error))?;

        info!("Installed ffmpeg at {}", self.binary_path.display());
        Ok(self.binary_path.clone())
    }

    /// Stream the archive at `url` into `destination`
    async fn download(&self, url: &str, destination: &Path) -> AcquisitionResult<()> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AcquisitionError::ServerError {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes from {}", received, url);
        Ok(())
    }
}

/// Unpack `archive` into `into` with the system tar
async fn extract(archive: &Path, into: &Path) -> AcquisitionResult<()> {
    let output = Command::new("tar")
        .arg("-xf")
        .arg(archive)
        .arg("-C")
        .arg(into)
        .output()
        .await
        .map_err(|source| AcquisitionError::Spawn {
            program: "tar".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(AcquisitionError::Extraction {
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Depth-first search for a regular file named like the binary
async fn find_binary(root: &Path) -> AcquisitionResult<Option<PathBuf>> {
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() && entry.file_name() == ffmpeg::BINARY_NAME {
                return Ok(Some(entry.path()));
            }
        }
    }

    Ok(None)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> AcquisitionResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = std::fs::Permissions::from_mode(ffmpeg::BINARY_PERMISSIONS);
    fs::set_permissions(path, permissions).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> AcquisitionResult<()> {
    Ok(())
}
