//! Command-line argument parsing for the media cache
//!
//! `serve` is the default command. Flags that mirror configuration file
//! settings are optional and only override the file when given; several of
//! them can also come from the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::constants::{env, paths};

/// Media cache - fetch, cache and serve remote media
#[derive(Parser, Debug)]
#[command(
    name = "media_cache",
    version,
    about = "Serve remote video and audio through a single-slot local cache",
    long_about = "An HTTP service that acquires media with yt-dlp, keeps the most recently
requested video and audio on disk, and evicts them once they sit idle."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding ffmpeg, yt-dlp.json and media-cache.toml
    #[arg(long, global = true, value_name = "DIR", env = env::CONFIG_DIR)]
    pub config_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Print the cache key for a URL
    Fingerprint(FingerprintArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen address, host:port
    #[arg(short, long, value_name = "ADDR", env = env::BIND_ADDR)]
    pub bind: Option<String>,

    /// Video cache directory
    #[arg(long, value_name = "DIR")]
    pub video_dir: Option<PathBuf>,

    /// Audio cache directory
    #[arg(long, value_name = "DIR")]
    pub audio_dir: Option<PathBuf>,

    /// Evict a resident after this much idle time (e.g. "15m")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub idle_threshold: Option<Duration>,

    /// Time between expiry sweeps (e.g. "60s")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub sweep_interval: Option<Duration>,

    /// Kill an acquisition that runs longer than this (e.g. "10m")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub acquisition_timeout: Option<Duration>,

    /// Extraction tool executable
    #[arg(long, value_name = "PROGRAM")]
    pub extractor: Option<String>,
}

/// Arguments for the fingerprint command
#[derive(Args, Debug, Clone)]
pub struct FingerprintArgs {
    /// Source URL
    pub url: String,

    /// Compute the audio key instead of the video key
    #[arg(long)]
    pub audio: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level from the flags, if any was given
    pub fn log_level_override(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.global.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }

    /// Command to run, `serve` when none was given
    ///
    /// The implicit `serve` still honours the bind address environment
    /// variable, since clap only reads it when the subcommand is parsed.
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or_else(|| {
            Commands::Serve(ServeArgs {
                bind: std::env::var(env::BIND_ADDR).ok(),
                ..Default::default()
            })
        })
    }
}

impl GlobalArgs {
    /// Configuration directory: flag or `CONFIG`, else the built-in default
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(paths::DEFAULT_CONFIG_DIR))
    }
}

impl ServeArgs {
    /// Overlay the flags that were given onto the loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(dir) = &self.video_dir {
            config.cache.video_dir = dir.clone();
        }
        if let Some(dir) = &self.audio_dir {
            config.cache.audio_dir = dir.clone();
        }
        if let Some(threshold) = self.idle_threshold {
            config.cache.idle_threshold = threshold;
        }
        if let Some(interval) = self.sweep_interval {
            config.cache.sweep_interval = interval;
        }
        if let Some(timeout) = self.acquisition_timeout {
            config.extractor.timeout = Some(timeout);
        }
        if let Some(program) = &self.extractor {
            config.extractor.program = program.clone();
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}
