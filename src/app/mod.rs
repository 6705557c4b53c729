//! Core application logic for the media cache
//!
//! A request names a URL and a media kind. Its fingerprint is looked up in
//! the kind's single cache slot; a hit is served straight from disk, a miss
//! is acquired through the extraction tool and replaces whatever the slot
//! held before. A background sweeper evicts a resident once it has been idle
//! for too long.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use media_cache::app::acquire::{AcquireConfig, YtDlpAcquirer};
//! use media_cache::app::cache::{CacheConfig, CacheSlots};
//! use media_cache::app::{MediaKind, RequestHandler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let slots = Arc::new(CacheSlots::new(CacheConfig::default()).await?);
//! let acquirer = Arc::new(YtDlpAcquirer::new(AcquireConfig::default())?);
//! let handler = RequestHandler::new(slots, acquirer);
//!
//! let media = handler
//!     .handle("https://example.com/watch?v=1", MediaKind::Video)
//!     .await?;
//! println!("{} ({} bytes, hit={})", media.file_name(), media.len, media.hit);
//! # Ok(())
//! # }
//! ```

pub mod acquire;
pub mod cache;
pub mod fingerprint;
pub mod handler;
pub mod media;
pub mod server;

// Re-export main public API
pub use acquire::{AcquireConfig, Acquirer, YtDlpAcquirer};
pub use cache::{BackgroundTasks, CacheConfig, CacheSlots, ExpirySweeper};
pub use fingerprint::{fingerprint, Fingerprint};
pub use handler::{CachedMedia, RequestHandler};
pub use media::MediaKind;
pub use server::{build_router, AppState};
