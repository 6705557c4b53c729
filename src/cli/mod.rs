//! Command-line interface components
//!
//! Argument parsing and the handlers that turn a parsed command into a
//! running service.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, FingerprintArgs, GlobalArgs, ServeArgs};
pub use commands::{handle_fingerprint, handle_serve, run_service};
