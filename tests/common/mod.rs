//! Shared helpers for the HTTP integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use media_cache::app::cache::{CacheConfig, CacheSlots};
use media_cache::app::server::{build_router, AppState};
use media_cache::app::{Acquirer, MediaKind, RequestHandler};
use media_cache::errors::{AcquisitionError, AcquisitionResult};

/// Acquirer driven by the URL
///
/// URLs containing `fail` leave a partial file and fail like the tool does,
/// URLs containing `missing` report success without output, anything else
/// writes `media:<url>` to the destination.
#[derive(Debug, Default)]
pub struct FakeAcquirer {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl FakeAcquirer {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("fail") {
            tokio::fs::write(destination.with_extension("part"), b"partial").await?;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if url.contains("fail") {
            return Err(AcquisitionError::ToolFailed {
                program: "yt-dlp".to_string(),
                status: "exit status: 1".to_string(),
                detail: format!("ERROR: Unsupported URL: {url}"),
            });
        }
        if url.contains("missing") {
            return Ok(destination.to_path_buf());
        }

        tokio::fs::write(destination, format!("media:{url}")).await?;
        Ok(destination.to_path_buf())
    }
}

/// A router bound to an ephemeral local port
pub struct TestServer {
    pub base_url: String,
    pub slots: Arc<CacheSlots>,
    pub acquirer: Arc<FakeAcquirer>,
    pub temp_dir: TempDir,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(FakeAcquirer::default()).await
    }

    pub async fn start_with(acquirer: FakeAcquirer) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let slots = Arc::new(
            CacheSlots::new(CacheConfig::with_cache_root(temp_dir.path()))
                .await
                .unwrap(),
        );
        let acquirer = Arc::new(acquirer);
        let handler = Arc::new(RequestHandler::new(slots.clone(), acquirer.clone()));

        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        std_listener.set_nonblocking(true).unwrap();
        let addr: SocketAddr = std_listener.local_addr().unwrap();
        let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();

        let router = build_router(AppState::new(handler));
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            slots,
            acquirer,
            temp_dir,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
