//! HTTP front end
//!
//! The server owns nothing but an [`AppState`] pointing at the shared
//! [`RequestHandler`]. It stops accepting connections when the shutdown
//! broadcast fires and gives in-flight responses a bounded time to finish.
//!
//! # Module Organization
//!
//! - [`routes`] - Router, handlers and error rendering
//! - [`signals`] - Ctrl-C / SIGTERM to shutdown broadcast
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use media_cache::app::acquire::{AcquireConfig, YtDlpAcquirer};
//! use media_cache::app::cache::{CacheConfig, CacheSlots};
//! use media_cache::app::handler::RequestHandler;
//! use media_cache::app::server::{self, AppState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let slots = Arc::new(CacheSlots::new(CacheConfig::default()).await?);
//! let acquirer = Arc::new(YtDlpAcquirer::new(AcquireConfig::default())?);
//! let state = AppState::new(Arc::new(RequestHandler::new(slots, acquirer)));
//!
//! let (shutdown_tx, shutdown_rx) = server::create_shutdown_channel();
//! let listener = server::bind("127.0.0.1:8000").await?;
//! server::serve(listener, state, shutdown_rx, Duration::from_secs(30)).await?;
//! # drop(shutdown_tx);
//! # Ok(())
//! # }
//! ```

pub mod routes;
pub mod signals;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::app::handler::RequestHandler;
use crate::errors::ServerError;

pub use routes::{build_router, DownloadRequest, ErrorBody};
pub use signals::{create_shutdown_channel, wait_for_shutdown_signal, SignalHandler};

/// Shared state handed to every route
#[derive(Debug, Clone)]
pub struct AppState {
    pub handler: Arc<RequestHandler>,
}

impl AppState {
    pub fn new(handler: Arc<RequestHandler>) -> Self {
        Self { handler }
    }
}

/// Bind the listening socket
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve until shutdown is broadcast
///
/// Once shutdown fires, requests still in flight get `drain_timeout` to
/// finish. After that the server returns without them.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown_rx: broadcast::Receiver<()>,
    drain_timeout: Duration,
) -> Result<(), ServerError> {
    let local: Option<SocketAddr> = listener.local_addr().ok();
    if let Some(addr) = local {
        info!("Listening on http://{}", addr);
    }

    let drain_rx = shutdown_rx.resubscribe();
    let server = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_shutdown_signal(shutdown_rx))
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result?,
        _ = wait_for_shutdown_signal(drain_rx) => {
            match tokio::time::timeout(drain_timeout, &mut server).await {
                Ok(result) => result?,
                Err(_) => warn!(
                    "Requests still in flight after {:?}, stopping without them",
                    drain_timeout
                ),
            }
        }
    }

    info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_error_statuses() {
        let not_found = AppError::NotFound {
            detail: "Video download failed".to_string(),
        };
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid = AppError::InvalidRequest {
            reason: "missing url".to_string(),
        };
        assert_eq!(
            invalid.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let generic = AppError::generic("boom");
        assert_eq!(
            generic.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_bind_reports_address() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let taken = listener.local_addr().unwrap().to_string();

        match bind(&taken).await {
            Err(ServerError::Bind { addr, .. }) => assert_eq!(addr, taken),
            other => panic!("expected bind failure, got {:?}", other.map(|_| ())),
        }
    }
}
