//! Command handlers for the media cache CLI
//!
//! This module connects parsed arguments and loaded configuration to the
//! core application: `serve` wires the cache, the acquirer, the sweeper and
//! the HTTP server together and tears them down on shutdown.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::app::server::{self, AppState, SignalHandler};
use crate::app::{
    fingerprint, Acquirer, BackgroundTasks, CacheSlots, MediaKind, RequestHandler, YtDlpAcquirer,
};
use crate::cli::{FingerprintArgs, ServeArgs};
use crate::config::AppConfig;
use crate::errors::Result;

/// Handle the serve command
///
/// Applies flag overrides, builds the production acquirer and runs the
/// service until Ctrl-C or SIGTERM.
pub async fn handle_serve(
    args: ServeArgs,
    mut config: AppConfig,
    config_dir: &Path,
) -> Result<()> {
    match AppConfig::initialize_first_run(config_dir).await {
        Ok(path) => info!("Configuration file: {}", path.display()),
        Err(e) => warn!("Could not write default configuration: {}", e),
    }

    args.apply_to(&mut config);
    config.validate()?;

    let acquirer = Arc::new(YtDlpAcquirer::new(config.acquire_config(config_dir))?);
    let listener = server::bind(&config.server.bind).await?;

    let (shutdown_tx, _) = server::create_shutdown_channel();
    let signal_task = SignalHandler::new(shutdown_tx.clone()).setup();

    let result = run_service(listener, &config, acquirer, shutdown_tx).await;
    signal_task.abort();
    result
}

/// Run the service on `listener` until `shutdown_tx` fires
///
/// Creates the cache directories, starts the expiry sweeper and serves HTTP.
/// Once the server stops, for whatever reason, the sweeper is stopped, the
/// slots are cleared and the cache directories removed.
pub async fn run_service(
    listener: TcpListener,
    config: &AppConfig,
    acquirer: Arc<dyn Acquirer>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<()> {
    let slots = Arc::new(CacheSlots::new(config.cache_config()).await?);
    let handler = Arc::new(RequestHandler::new(slots.clone(), acquirer));

    let mut tasks = BackgroundTasks::new();
    tasks.start_expiry_sweeper(slots.clone(), shutdown_tx.subscribe());
    info!(
        "Started {} background task(s), idle threshold {:?}",
        tasks.task_count(),
        config.cache.idle_threshold
    );

    let served = server::serve(
        listener,
        AppState::new(handler),
        shutdown_tx.subscribe(),
        config.server.shutdown_timeout,
    )
    .await;

    // The server may have stopped on its own; make sure the sweeper follows.
    let _ = shutdown_tx.send(());
    tasks.shutdown_all().await;
    slots.teardown().await;

    info!("Shutdown complete");
    served.map_err(Into::into)
}

/// Handle the fingerprint command
pub async fn handle_fingerprint(args: FingerprintArgs) -> Result<()> {
    let kind = if args.audio {
        MediaKind::Audio
    } else {
        MediaKind::Video
    };

    let fp = fingerprint(&args.url, kind);
    println!("{}", fp.file_name(kind));
    Ok(())
}
