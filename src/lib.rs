//! Media Cache Library
//!
//! An HTTP service that fetches remote video and audio through yt-dlp and
//! keeps the most recently requested item of each kind in a single-slot,
//! time-expiring local cache.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(ENV_CONFIG_DIR, "CONFIG");
        assert_eq!(IDLE_THRESHOLD.as_secs(), 900);
        assert!(USER_AGENT.starts_with("media-cache/"));
    }

    #[test]
    fn test_error_types() {
        let app_error = AppError::NotFound {
            detail: "Video download failed".to_string(),
        };

        assert_eq!(app_error.category(), "not_found");
    }
}
