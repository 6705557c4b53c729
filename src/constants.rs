//! Application constants for the media cache service
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Environment variable selecting the configuration directory
    pub const CONFIG_DIR: &str = "CONFIG";

    /// Environment variable overriding the listen address
    pub const BIND_ADDR: &str = "MEDIA_CACHE_BIND";
}

/// Filesystem locations and file names
pub mod paths {
    /// Default configuration directory (holds ffmpeg and yt-dlp.json)
    pub const DEFAULT_CONFIG_DIR: &str = "/config";

    /// Default cache directory for video files
    pub const DEFAULT_VIDEO_CACHE_DIR: &str = "/tmp/video_cache";

    /// Default cache directory for audio files
    pub const DEFAULT_AUDIO_CACHE_DIR: &str = "/tmp/audio_cache";

    /// Service configuration file name inside the configuration directory
    pub const SERVICE_CONFIG_FILE: &str = "media-cache.toml";

    /// Extractor options file name inside the configuration directory
    pub const EXTRACTOR_OPTIONS_FILE: &str = "yt-dlp.json";
}

/// Cache slot and sweeper timing
pub mod cache {
    use super::Duration;

    /// Idle time after which a resident file is evicted
    pub const IDLE_THRESHOLD: Duration = Duration::from_secs(15 * 60);

    /// How often the expiry sweeper checks the slots
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    /// Timeout for background task shutdown
    pub const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
}

/// External extraction tool defaults
pub mod extractor {
    /// Executable name of the extraction tool
    pub const PROGRAM: &str = "yt-dlp";

    /// Default video format selector
    pub const DEFAULT_VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4";

    /// Default output naming template (always overridden per request)
    pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s-%(id)s.%(ext)s";

    /// Format selector used for audio requests
    pub const AUDIO_FORMAT: &str = "bestaudio/best";

    /// Codec audio requests are transcoded to
    pub const AUDIO_CODEC: &str = "mp3";

    /// Bitrate audio requests are transcoded to
    pub const AUDIO_QUALITY: &str = "128K";

    /// Container video requests are merged into
    pub const VIDEO_CONTAINER: &str = "mp4";
}

/// Media-processing binary distribution
pub mod ffmpeg {
    /// Release base URL for the static ffmpeg builds
    pub const BUILDS_URL: &str = "https://github.com/yt-dlp/FFmpeg-Builds/releases/download/latest";

    /// Binary name inside the archive and in the configuration directory
    pub const BINARY_NAME: &str = "ffmpeg";

    /// Archive name for linux/x86_64
    pub const LINUX_X86_64_ARCHIVE: &str = "ffmpeg-master-latest-linux64-gpl.tar.xz";

    /// Archive name for linux/aarch64
    pub const LINUX_AARCH64_ARCHIVE: &str = "ffmpeg-master-latest-linuxarm64-gpl.tar.xz";

    /// Permissions applied to the installed binary
    #[cfg(unix)]
    pub const BINARY_PERMISSIONS: u32 = 0o755;
}

/// HTTP server and client settings
pub mod http {
    use super::Duration;

    /// Default listen address
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

    /// User agent for outbound requests
    pub const USER_AGENT: &str = concat!("media-cache/", env!("CARGO_PKG_VERSION"));

    /// Connection timeout for the ffmpeg archive download
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// How long shutdown waits for in-flight requests
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

    /// Content type of cached video responses
    pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

    /// Content type of cached audio responses
    pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
}

/// Logging defaults
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use cache::{IDLE_THRESHOLD, SWEEP_INTERVAL};
pub use env::CONFIG_DIR as ENV_CONFIG_DIR;
pub use http::{DEFAULT_BIND_ADDR, USER_AGENT};
