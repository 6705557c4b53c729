//! Media kinds served by the cache
//!
//! A [`MediaKind`] decides which cache slot and directory a request lands in,
//! which extension and content type the cached file carries, and which
//! parameters the extraction tool is invoked with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::http;

/// Kind of media a client asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Muxed video and audio in an mp4 container
    Video,
    /// Audio only, transcoded to mp3
    Audio,
}

impl MediaKind {
    /// All kinds, in slot order
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Audio];

    /// File extension of cached files (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// Content type the cached file is served with
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaKind::Video => http::VIDEO_CONTENT_TYPE,
            MediaKind::Audio => http::AUDIO_CONTENT_TYPE,
        }
    }

    /// Discriminator mixed into fingerprints
    pub fn tag(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Human-readable noun used in error messages ("Video download failed")
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}
