//! Cache slot set with directory lifecycle
//!
//! [`CacheSlots`] owns one [`CacheSlot`] per media kind plus the cache
//! directories backing them. It is constructed once at startup, shared by the
//! request handler and the expiry sweeper, and torn down at shutdown, which
//! clears every slot and removes the directories.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::app::fingerprint::Fingerprint;
use crate::app::media::MediaKind;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::slot::{CacheSlot, SlotStatus};

/// One cache slot per media kind
#[derive(Debug)]
pub struct CacheSlots {
    config: CacheConfig,
    video: CacheSlot,
    audio: CacheSlot,
}

impl CacheSlots {
    /// Create empty slots and their cache directories
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if a cache directory cannot be created
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        for kind in MediaKind::ALL {
            Self::ensure_directory_exists(config.directory(kind)).await?;
        }

        info!(
            "Initialized cache slots: video={}, audio={}",
            config.video_dir.display(),
            config.audio_dir.display()
        );

        Ok(Self {
            config,
            video: CacheSlot::new(MediaKind::Video),
            audio: CacheSlot::new(MediaKind::Audio),
        })
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Slot for a media kind
    pub fn slot(&self, kind: MediaKind) -> &CacheSlot {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    /// All slots, in `MediaKind::ALL` order
    pub fn slots(&self) -> [&CacheSlot; 2] {
        [&self.video, &self.audio]
    }

    /// Cache directory for a media kind
    pub fn directory(&self, kind: MediaKind) -> &Path {
        self.config.directory(kind)
    }

    /// Destination path for a fingerprint inside its kind's cache directory
    pub fn destination(&self, kind: MediaKind, fingerprint: &Fingerprint) -> PathBuf {
        self.directory(kind).join(fingerprint.file_name(kind))
    }

    /// Snapshot of every slot
    pub async fn status(&self) -> Vec<SlotStatus> {
        let now = Instant::now();
        let mut statuses = Vec::with_capacity(2);
        for slot in self.slots() {
            statuses.push(slot.status(now).await);
        }
        statuses
    }

    /// Clear every slot and remove the cache directories
    pub async fn teardown(&self) {
        for slot in self.slots() {
            slot.clear().await;
        }

        for kind in MediaKind::ALL {
            let dir = self.directory(kind);
            match fs::remove_dir_all(dir).await {
                Ok(()) => debug!("Removed cache directory: {}", dir.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove cache directory {}: {}", dir.display(), e),
            }
        }

        info!("Cache torn down");
    }

    /// Ensure a directory exists, creating it if necessary
    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }
}
