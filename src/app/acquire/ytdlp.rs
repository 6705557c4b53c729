//! yt-dlp backed acquisition
//!
//! [`YtDlpAcquirer`] runs the extraction tool as a child process with
//! kind-specific arguments and reports a typed error for any abnormal exit.
//! It writes only to the destination it was given (plus the tool's own
//! intermediate files next to it); cleaning up after a failure is left to
//! the caller.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::app::media::MediaKind;
use crate::constants::extractor;
use crate::errors::{AcquisitionError, AcquisitionResult};

use super::config::AcquireConfig;
use super::ffmpeg::FfmpegInstaller;
use super::options::ExtractorOptions;
use super::Acquirer;

/// Most stderr characters kept in an error detail
const MAX_DETAIL_CHARS: usize = 2000;

/// Acquirer that shells out to yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    config: AcquireConfig,
    ffmpeg: FfmpegInstaller,
}

impl YtDlpAcquirer {
    /// Create an acquirer from configuration
    pub fn new(config: AcquireConfig) -> AcquisitionResult<Self> {
        let ffmpeg = FfmpegInstaller::new(&config)?;
        Ok(Self { config, ffmpeg })
    }

    async fn run(&self, args: Vec<OsString>) -> AcquisitionResult<()> {
        let program = &self.config.program;
        debug!("Running {} {:?}", program, args);

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AcquisitionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                // Dropping the future kills the child.
                .map_err(|_| AcquisitionError::Timeout {
                    seconds: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        if !output.status.success() {
            return Err(AcquisitionError::ToolFailed {
                program: program.clone(),
                status: output.status.to_string(),
                detail: summarize_stderr(&output.stderr),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Acquirer for YtDlpAcquirer {
    async fn acquire(
        &self,
        url: &str,
        kind: MediaKind,
        destination: &Path,
    ) -> AcquisitionResult<PathBuf> {
        let url = validate_url(url)?;
        let ffmpeg_path = self.ffmpeg.ensure_installed().await?;
        let options = ExtractorOptions::load_or_init(&self.config.options_path()).await?;

        let ffmpeg_dir = ffmpeg_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let args = build_args(url, kind, destination, &options, &ffmpeg_dir);

        info!("Acquiring {} for {}", kind, url);
        if let Err(e) = self.run(args).await {
            warn!("Acquisition of {} failed: {}", url, e);
            return Err(e);
        }

        Ok(destination.to_path_buf())
    }
}

/// Trim a request URL and reject what the tool could never accept
///
/// Anything else goes to the tool unchanged, including bare video ids and
/// extractor pseudo-URLs such as `ytsearch:...`; the tool's own exit status
/// decides whether it is supported.
pub fn validate_url(raw: &str) -> AcquisitionResult<&str> {
    let url = raw.trim();
    let reason = if url.is_empty() {
        "URL is empty"
    } else if url.chars().any(char::is_control) {
        "URL contains a control character"
    } else {
        return Ok(url);
    };

    Err(AcquisitionError::InvalidUrl {
        url: raw.escape_debug().to_string(),
        reason: reason.to_string(),
    })
}

/// Command-line arguments for one acquisition
///
/// Video requests use the configured format selector merged into mp4 at the
/// exact destination. Audio requests take the best audio stream and transcode
/// it to mp3; the output template drops the destination's extension because
/// the tool appends the post-processed one itself.
pub fn build_args(
    url: &str,
    kind: MediaKind,
    destination: &Path,
    options: &ExtractorOptions,
    ffmpeg_dir: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--no-playlist".into(), "--no-progress".into()];

    match kind {
        MediaKind::Video => {
            args.extend([
                "--format".into(),
                options.format.clone().into(),
                "--merge-output-format".into(),
                extractor::VIDEO_CONTAINER.into(),
                "--output".into(),
                destination.as_os_str().to_owned(),
            ]);
        }
        MediaKind::Audio => {
            let mut template = destination.with_extension("").into_os_string();
            template.push(".%(ext)s");
            args.extend([
                "--format".into(),
                extractor::AUDIO_FORMAT.into(),
                "--extract-audio".into(),
                "--audio-format".into(),
                extractor::AUDIO_CODEC.into(),
                "--audio-quality".into(),
                extractor::AUDIO_QUALITY.into(),
                "--output".into(),
                template,
            ]);
        }
    }

    args.extend([
        "--ffmpeg-location".into(),
        ffmpeg_dir.as_os_str().to_owned(),
        "--".into(),
        url.into(),
    ]);
    args
}

/// Keep the tail of the tool's stderr, where its error lines are
fn summarize_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no error output".to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MAX_DETAIL_CHARS {
        text.to_string()
    } else {
        chars[chars.len() - MAX_DETAIL_CHARS..].iter().collect()
    }
}
