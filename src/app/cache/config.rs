//! Cache configuration types and defaults
//!
//! This module contains the runtime configuration for the cache slots and
//! the expiry sweeper.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::media::MediaKind;
use crate::constants::{cache, paths};

/// Configuration for the single-slot caches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the resident video file
    pub video_dir: PathBuf,
    /// Directory holding the resident audio file
    pub audio_dir: PathBuf,
    /// Idle time after which a resident file is evicted
    pub idle_threshold: Duration,
    /// Interval between sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from(paths::DEFAULT_VIDEO_CACHE_DIR),
            audio_dir: PathBuf::from(paths::DEFAULT_AUDIO_CACHE_DIR),
            idle_threshold: cache::IDLE_THRESHOLD,
            sweep_interval: cache::SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Create a configuration with both cache directories under `root`
    pub fn with_cache_root(root: &Path) -> Self {
        Self {
            video_dir: root.join("video_cache"),
            audio_dir: root.join("audio_cache"),
            ..Default::default()
        }
    }

    /// Set the idle threshold
    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    /// Set the sweep interval
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Cache directory for a media kind
    pub fn directory(&self, kind: MediaKind) -> &Path {
        match kind {
            MediaKind::Video => &self.video_dir,
            MediaKind::Audio => &self.audio_dir,
        }
    }
}
