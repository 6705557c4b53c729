//! Single-occupant cache slot
//!
//! A [`CacheSlot`] holds at most one resident file for one media kind. The
//! resident's identity and path live behind a per-slot read/write lock:
//! lookups share the read side, while replacement, idle eviction and clearing
//! take the write side, so no caller ever sees a claimed residency whose file
//! is already gone. The last-access clock is an atomic so that hits can
//! refresh it without excluding each other.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::app::fingerprint::Fingerprint;
use crate::app::media::MediaKind;
use crate::errors::{CacheError, CacheResult};

/// The file currently held by a slot
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resident {
    fingerprint: Fingerprint,
    path: PathBuf,
}

/// Point-in-time view of a slot, for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    /// Media kind served by the slot
    pub kind: MediaKind,
    /// Fingerprint of the resident, if any
    pub fingerprint: Option<Fingerprint>,
    /// Resident file name, if any
    pub file_name: Option<String>,
    /// Seconds since the resident was last requested
    pub idle_secs: Option<u64>,
}

/// Cache slot for one media kind
#[derive(Debug)]
pub struct CacheSlot {
    kind: MediaKind,
    /// Reference point for `last_access`
    epoch: Instant,
    resident: RwLock<Option<Resident>>,
    /// Nanoseconds since `epoch` of the last replace or hit
    last_access: AtomicU64,
}

impl CacheSlot {
    /// Create an empty slot
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            epoch: Instant::now(),
            resident: RwLock::new(None),
            last_access: AtomicU64::new(0),
        }
    }

    /// Media kind served by this slot
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Look up a fingerprint, refreshing the idle clock on a hit
    pub async fn lookup(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        self.lookup_at(fingerprint, Instant::now()).await
    }

    /// Look up a fingerprint as of `now`
    ///
    /// Returns the resident path iff the resident fingerprint matches. A
    /// mismatch is a plain miss and leaves the resident untouched.
    pub async fn lookup_at(&self, fingerprint: &Fingerprint, now: Instant) -> Option<PathBuf> {
        let resident = self.resident.read().await;
        match resident.as_ref() {
            Some(current) if current.fingerprint == *fingerprint => {
                self.touch(now);
                debug!("{} slot hit: {}", self.kind, fingerprint);
                Some(current.path.clone())
            }
            _ => {
                debug!("{} slot miss: {}", self.kind, fingerprint);
                None
            }
        }
    }

    /// Install a new resident, deleting the previous resident's file
    ///
    /// Returns the path of the evicted file, if one was deleted.
    pub async fn replace(&self, fingerprint: Fingerprint, path: PathBuf) -> Option<PathBuf> {
        self.replace_at(fingerprint, path, Instant::now()).await
    }

    /// Install a new resident as of `now`
    pub async fn replace_at(
        &self,
        fingerprint: Fingerprint,
        path: PathBuf,
        now: Instant,
    ) -> Option<PathBuf> {
        let mut resident = self.resident.write().await;

        let evicted = match resident.take() {
            // Same destination: the new file already overwrote the old one.
            Some(previous) if previous.path == path => None,
            Some(previous) => {
                if let Err(e) = remove_resident_file(&previous.path).await {
                    warn!("{}", e);
                }
                Some(previous.path)
            }
            None => None,
        };

        info!("{} slot now holds {}", self.kind, path.display());
        *resident = Some(Resident { fingerprint, path });
        self.touch(now);

        evicted
    }

    /// Evict the resident if it has been idle longer than `threshold`
    ///
    /// Returns true if a resident was evicted.
    pub async fn evict_if_idle(&self, now: Instant, threshold: Duration) -> bool {
        let mut resident = self.resident.write().await;

        let Some(current) = resident.as_ref() else {
            return false;
        };

        let idle = self.idle_for(now);
        if idle <= threshold {
            return false;
        }

        if let Err(e) = remove_resident_file(&current.path).await {
            warn!("{}", e);
        }
        info!(
            "Evicted idle {} after {}s: {}",
            self.kind,
            idle.as_secs(),
            current.path.display()
        );
        *resident = None;
        true
    }

    /// Unconditionally evict the resident
    ///
    /// Returns true if a resident was evicted.
    pub async fn clear(&self) -> bool {
        let mut resident = self.resident.write().await;
        match resident.take() {
            Some(previous) => {
                if let Err(e) = remove_resident_file(&previous.path).await {
                    warn!("{}", e);
                }
                debug!("Cleared {} slot", self.kind);
                true
            }
            None => false,
        }
    }

    /// Fingerprint of the current resident
    pub async fn resident(&self) -> Option<Fingerprint> {
        self.resident.read().await.as_ref().map(|r| r.fingerprint)
    }

    /// Snapshot of the slot as of `now`
    pub async fn status(&self, now: Instant) -> SlotStatus {
        let resident = self.resident.read().await;
        SlotStatus {
            kind: self.kind,
            fingerprint: resident.as_ref().map(|r| r.fingerprint),
            file_name: resident.as_ref().and_then(|r| {
                r.path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            }),
            idle_secs: resident.as_ref().map(|_| self.idle_for(now).as_secs()),
        }
    }

    fn touch(&self, now: Instant) {
        let nanos = now.saturating_duration_since(self.epoch).as_nanos() as u64;
        self.last_access.store(nanos, Ordering::Release);
    }

    fn idle_for(&self, now: Instant) -> Duration {
        let last = self.epoch + Duration::from_nanos(self.last_access.load(Ordering::Acquire));
        now.saturating_duration_since(last)
    }
}

/// Delete a resident file, treating an already-missing file as removed
async fn remove_resident_file(path: &Path) -> CacheResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
