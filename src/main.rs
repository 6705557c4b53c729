//! Media cache service
//!
//! Serves `POST /download/` and `POST /download-audio/` from a single-slot
//! cache per media kind, acquiring misses through yt-dlp.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use media_cache::cli::{handle_fingerprint, handle_serve, Cli, Commands};
use media_cache::config::AppConfig;
use media_cache::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // A missing .env file is normal
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config_dir = cli.global.config_dir();
    let config = AppConfig::load(cli.global.config.clone(), &config_dir).await?;

    init_logging(&cli, &config);

    info!("Media cache v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command_or_default() {
        Commands::Serve(args) => {
            info!("Config directory: {}", config_dir.display());
            handle_serve(args, config, &config_dir).await
        }
        Commands::Fingerprint(args) => handle_fingerprint(args).await,
    }
}

/// Initialize logging from the verbosity flags, falling back to the config
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level_override()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.to_lowercase());

    let mut filter = EnvFilter::from_default_env();
    for target in ["media_cache", "tower_http"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log level '{}': {}", level, e),
        }
    }

    fmt()
        .with_env_filter(filter)
        .with_target(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
