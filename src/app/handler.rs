//! Request flow from URL to cached file
//!
//! [`RequestHandler`] computes the fingerprint, serves a resident file when
//! the slot already holds it, and otherwise acquires the media into the
//! kind's cache directory and installs it as the new resident. Concurrent
//! misses for one fingerprint go through the [`InFlight`] gate so the media
//! is acquired once; the waiters re-check the slot and are served as hits.
//!
//! A failed acquisition never touches the slot. Any partial output named
//! after the fingerprint is deleted before the error is returned.
//!
//! Misses run in a spawned task that owns the gate. A client that goes away
//! stops waiting for the result but never cancels the acquisition itself.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, File};
use tracing::{debug, info, warn};

use crate::app::acquire::Acquirer;
use crate::app::cache::{CacheSlots, InFlight};
use crate::app::fingerprint::{fingerprint, Fingerprint};
use crate::app::media::MediaKind;
use crate::errors::{AcquisitionError, AppError, Result};

/// A resident file opened for streaming
#[derive(Debug)]
pub struct CachedMedia {
    pub kind: MediaKind,
    pub fingerprint: Fingerprint,
    pub path: PathBuf,
    /// Handle opened before the response is built; survives a later eviction
    pub file: File,
    pub len: u64,
    /// Whether the slot already held the file
    pub hit: bool,
}

impl CachedMedia {
    /// Download file name, `<fingerprint>.<ext>`
    pub fn file_name(&self) -> String {
        self.fingerprint.file_name(self.kind)
    }
}

/// Serves media requests from the cache slots
#[derive(Clone)]
pub struct RequestHandler {
    slots: Arc<CacheSlots>,
    acquirer: Arc<dyn Acquirer>,
    inflight: Arc<InFlight>,
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("slots", &self.slots)
            .field("inflight", &self.inflight)
            .finish_non_exhaustive()
    }
}

impl RequestHandler {
    pub fn new(slots: Arc<CacheSlots>, acquirer: Arc<dyn Acquirer>) -> Self {
        Self {
            slots,
            acquirer,
            inflight: Arc::new(InFlight::new()),
        }
    }

    /// Get the cache slots
    pub fn slots(&self) -> &Arc<CacheSlots> {
        &self.slots
    }

    /// Resolve a request to an open cached file
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` when acquisition reported success but produced
    ///   no file
    /// - `AppError::Acquisition` / `AppError::Config` when acquisition failed,
    ///   including an empty URL
    pub async fn handle(&self, url: &str, kind: MediaKind) -> Result<CachedMedia> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AcquisitionError::InvalidUrl {
                url: String::new(),
                reason: "URL is empty".to_string(),
            }
            .into());
        }

        let fp = fingerprint(url, kind);
        if let Some(media) = self.try_hit(kind, fp).await? {
            return Ok(media);
        }

        let this = self.clone();
        let url = url.to_string();
        tokio::spawn(async move { this.resolve_miss(&url, kind, fp).await })
            .await
            .map_err(|e| AppError::generic(format!("Acquisition task failed: {e}")))?
    }

    async fn resolve_miss(
        &self,
        url: &str,
        kind: MediaKind,
        fp: Fingerprint,
    ) -> Result<CachedMedia> {
        let _guard = self.inflight.enter(fp).await;
        // Another request may have acquired it while we waited.
        if let Some(media) = self.try_hit(kind, fp).await? {
            return Ok(media);
        }

        self.acquire_and_replace(url, kind, fp).await
    }

    async fn try_hit(&self, kind: MediaKind, fp: Fingerprint) -> Result<Option<CachedMedia>> {
        let Some(path) = self.slots.slot(kind).lookup(&fp).await else {
            return Ok(None);
        };

        match open_media(&path).await {
            Ok((file, len)) => {
                info!("Serving cached {} {}", kind, fp);
                Ok(Some(CachedMedia {
                    kind,
                    fingerprint: fp,
                    path,
                    file,
                    len,
                    hit: true,
                }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Resident {} vanished before open, treating as miss", fp);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn acquire_and_replace(
        &self,
        url: &str,
        kind: MediaKind,
        fp: Fingerprint,
    ) -> Result<CachedMedia> {
        let destination = self.slots.destination(kind, &fp);
        info!("Cache miss for {} {}, acquiring {}", kind, fp, url);

        let path = match self.acquirer.acquire(url, kind, &destination).await {
            Ok(path) => path,
            Err(e) => {
                remove_partials(self.slots.directory(kind), &fp).await;
                return Err(e.into());
            }
        };

        // Open before installing: the handle outlives a concurrent eviction.
        let (file, len) = match open_media(&path).await {
            Ok(opened) => opened,
            Err(e) => {
                remove_partials(self.slots.directory(kind), &fp).await;
                return Err(if e.kind() == ErrorKind::NotFound {
                    AppError::NotFound {
                        detail: format!("{} download failed", kind.label()),
                    }
                } else {
                    e.into()
                });
            }
        };

        self.slots.slot(kind).replace(fp, path.clone()).await;

        Ok(CachedMedia {
            kind,
            fingerprint: fp,
            path,
            file,
            len,
            hit: false,
        })
    }
}

async fn open_media(path: &Path) -> std::io::Result<(File, u64)> {
    let file = File::open(path).await?;
    let len = file.metadata().await?.len();
    Ok((file, len))
}

/// Delete every file in `dir` named `<fingerprint>.*`
///
/// Only called for a fingerprint that is not resident, so this never
/// removes a file the slot still points at.
async fn remove_partials(dir: &Path, fp: &Fingerprint) -> usize {
    let prefix = format!("{}.", fp.to_hex());
    let mut removed = 0;

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot scan {} for partial files: {}", dir.display(), e);
            return 0;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Cannot scan {} for partial files: {}", dir.display(), e);
                break;
            }
        };

        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed partial file {}", entry.path().display());
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove partial {}: {}", entry.path().display(), e),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cache::CacheConfig;
    use crate::errors::{AcquisitionError, AcquisitionResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Outcome {
        Write,
        /// Leaves a partial file and fails
        Fail,
        /// Fails like `Fail` on the first call, writes afterwards
        FailFirst,
        /// Reports success without writing anything
        NoOutput,
    }

    struct FakeAcquirer {
        outcome: Outcome,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeAcquirer {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Acquirer for FakeAcquirer {
        async fn acquire(
            &self,
            url: &str,
            _kind: MediaKind,
            destination: &Path,
        ) -> AcquisitionResult<PathBuf> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let fails = match self.outcome {
                Outcome::Fail => true,
                Outcome::FailFirst => call == 0,
                _ => false,
            };
            if fails {
                fs::write(destination.with_extension("part"), b"half").await?;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.outcome {
                _ if fails => Err(AcquisitionError::ToolFailed {
                    program: "yt-dlp".to_string(),
                    status: "exit status: 1".to_string(),
                    detail: format!("ERROR: Unsupported URL: {url}"),
                }),
                Outcome::NoOutput => Ok(destination.to_path_buf()),
                _ => {
                    fs::write(destination, url.as_bytes()).await?;
                    Ok(destination.to_path_buf())
                }
            }
        }
    }

    async fn setup(temp_dir: &TempDir, acquirer: Arc<FakeAcquirer>) -> RequestHandler {
        let slots = CacheSlots::new(CacheConfig::with_cache_root(temp_dir.path()))
            .await
            .unwrap();
        RequestHandler::new(Arc::new(slots), acquirer)
    }

    async fn read_all(media: &mut CachedMedia) -> String {
        let mut content = String::new();
        media.file.read_to_string(&mut content).await.unwrap();
        content
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let mut first = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        assert!(!first.hit);
        assert_eq!(read_all(&mut first).await, "https://x/1");
        assert_eq!(first.len, "https://x/1".len() as u64);

        let second = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        assert!(second.hit);
        assert_eq!(second.path, first.path);
        assert_eq!(acquirer.calls(), 1);
        assert!(first.file_name().ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_same_request() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        handler.handle("https://x/1", MediaKind::Audio).await.unwrap();
        let again = handler.handle("  https://x/1\n", MediaKind::Audio).await.unwrap();

        assert!(again.hit);
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_url_replaces_resident() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let first = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        let second = handler.handle("https://x/2", MediaKind::Video).await.unwrap();

        assert!(!first.path.exists());
        assert!(second.path.exists());
        assert_eq!(
            handler.slots().slot(MediaKind::Video).resident().await,
            Some(fingerprint("https://x/2", MediaKind::Video))
        );
        assert_eq!(acquirer.calls(), 2);
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let video = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        let audio = handler.handle("https://x/1", MediaKind::Audio).await.unwrap();

        assert!(video.path.exists());
        assert!(audio.path.exists());
        assert_ne!(video.fingerprint, audio.fingerprint);
        assert!(audio.path.starts_with(temp_dir.path().join("audio_cache")));
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_and_removes_partials() {
        let temp_dir = TempDir::new().unwrap();
        let good = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, good).await;
        let resident = handler.handle("https://x/1", MediaKind::Video).await.unwrap();

        let failing = RequestHandler::new(
            handler.slots().clone(),
            Arc::new(FakeAcquirer::new(Outcome::Fail)),
        );
        let err = failing
            .handle("https://x/3", MediaKind::Video)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Acquisition(_)));
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("Unsupported URL"));

        // Resident untouched, partial gone
        assert!(resident.path.exists());
        assert_eq!(
            handler.slots().slot(MediaKind::Video).resident().await,
            Some(resident.fingerprint)
        );
        let fp3 = fingerprint("https://x/3", MediaKind::Video);
        let partial = handler
            .slots()
            .destination(MediaKind::Video, &fp3)
            .with_extension("part");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn test_missing_output_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::NoOutput));
        let handler = setup(&temp_dir, acquirer).await;

        let err = handler
            .handle("https://x/1", MediaKind::Audio)
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Audio download failed");
        assert_eq!(handler.slots().slot(MediaKind::Audio).resident().await, None);
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let err = handler.handle("   ", MediaKind::Video).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Acquisition(AcquisitionError::InvalidUrl { .. })
        ));
        assert_eq!(err.status_code(), 500);
        assert_eq!(acquirer.calls(), 0);
    }

    #[tokio::test]
    async fn test_vanished_resident_is_reacquired() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer::new(Outcome::Write));
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let first = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        std::fs::remove_file(&first.path).unwrap();

        let second = handler.handle("https://x/1", MediaKind::Video).await.unwrap();

        assert!(!second.hit);
        assert!(second.path.exists());
        assert_eq!(acquirer.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_are_coalesced() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer {
            delay: Duration::from_millis(100),
            ..FakeAcquirer::new(Outcome::Write)
        });
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let (a, b) = tokio::join!(
            handler.handle("https://x/1", MediaKind::Video),
            handler.handle("https://x/1", MediaKind::Video),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(acquirer.calls(), 1);
        assert_ne!(a.hit, b.hit);
        assert_eq!(a.path, b.path);
    }

    #[tokio::test]
    async fn test_waiter_reacquires_after_leader_fails() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer {
            delay: Duration::from_millis(100),
            ..FakeAcquirer::new(Outcome::FailFirst)
        });
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let (a, b) = tokio::join!(
            handler.handle("https://x/1", MediaKind::Video),
            handler.handle("https://x/1", MediaKind::Video),
        );

        // One request saw the failure, the other acquired on its own
        let (failed, served) = match (a, b) {
            (Err(e), Ok(media)) | (Ok(media), Err(e)) => (e, media),
            (a, b) => panic!("expected one failure, got {:?} and {:?}", a.is_ok(), b.is_ok()),
        };
        assert_eq!(failed.status_code(), 500);
        assert!(!served.hit);
        assert!(served.path.exists());
        assert_eq!(acquirer.calls(), 2);

        let fp = fingerprint("https://x/1", MediaKind::Video);
        assert_eq!(handler.slots().slot(MediaKind::Video).resident().await, Some(fp));
        let partial = handler
            .slots()
            .destination(MediaKind::Video, &fp)
            .with_extension("part");
        assert!(!partial.exists());
    }

    #[tokio::test]
    async fn test_failed_waiters_each_retry() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer {
            delay: Duration::from_millis(50),
            ..FakeAcquirer::new(Outcome::Fail)
        });
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let (a, b) = tokio::join!(
            handler.handle("https://x/1", MediaKind::Audio),
            handler.handle("https://x/1", MediaKind::Audio),
        );

        assert!(a.is_err());
        assert!(b.is_err());
        assert_eq!(acquirer.calls(), 2);
        assert_eq!(handler.slots().slot(MediaKind::Audio).resident().await, None);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer {
            delay: Duration::from_millis(200),
            ..FakeAcquirer::new(Outcome::Fail)
        });
        let handler = setup(&temp_dir, acquirer.clone()).await;
        let fp = fingerprint("https://x/1", MediaKind::Video);
        let partial = handler
            .slots()
            .destination(MediaKind::Video, &fp)
            .with_extension("part");

        // Caller gives up while the tool is still running
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            handler.handle("https://x/1", MediaKind::Video),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(partial.exists());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!partial.exists());
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_installs_resident() {
        let temp_dir = TempDir::new().unwrap();
        let acquirer = Arc::new(FakeAcquirer {
            delay: Duration::from_millis(200),
            ..FakeAcquirer::new(Outcome::Write)
        });
        let handler = setup(&temp_dir, acquirer.clone()).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            handler.handle("https://x/1", MediaKind::Video),
        )
        .await;
        assert!(abandoned.is_err());

        // The retry waits on the running acquisition and is served from it
        let retry = handler.handle("https://x/1", MediaKind::Video).await.unwrap();
        assert!(retry.hit);
        assert_eq!(acquirer.calls(), 1);
    }

    #[tokio::test]
    async fn test_remove_partials_only_matches_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let fp = fingerprint("https://x/1", MediaKind::Audio);
        let other = fingerprint("https://x/2", MediaKind::Audio);

        fs::write(temp_dir.path().join(format!("{}.webm", fp)), b"x")
            .await
            .unwrap();
        fs::write(temp_dir.path().join(format!("{}.mp3.part", fp)), b"x")
            .await
            .unwrap();
        fs::write(temp_dir.path().join(other.file_name(MediaKind::Audio)), b"x")
            .await
            .unwrap();

        assert_eq!(remove_partials(temp_dir.path(), &fp).await, 2);
        assert!(temp_dir.path().join(other.file_name(MediaKind::Audio)).exists());
    }
}
