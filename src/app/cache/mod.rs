//! Single-slot media cache with background expiry
//!
//! Each media kind owns exactly one cache slot holding the most recently
//! requested file. A new fingerprint replaces (and deletes) the previous
//! resident, hits refresh the idle clock, and a background sweeper evicts a
//! resident once it has been idle past the threshold.
//!
//! # Module Organization
//!
//! - [`config`] - Cache directories and timing
//! - [`slot`] - The per-kind slot and its locking discipline
//! - [`manager`] - The slot set and cache directory lifecycle
//! - [`inflight`] - Coalescing of concurrent identical misses
//! - [`sweeper`] - Idle eviction background task
//!
//! # Examples
//!
//! ```rust,no_run
//! use media_cache::app::cache::{CacheConfig, CacheSlots};
//! use media_cache::app::{fingerprint, MediaKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let slots = CacheSlots::new(CacheConfig::default()).await?;
//! let fp = fingerprint("https://example.com/watch?v=1", MediaKind::Video);
//!
//! match slots.slot(MediaKind::Video).lookup(&fp).await {
//!     Some(path) => println!("cached at {}", path.display()),
//!     None => {
//!         let dest = slots.destination(MediaKind::Video, &fp);
//!         // ... acquire into `dest` ...
//!         slots.slot(MediaKind::Video).replace(fp, dest).await;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod inflight;
pub mod manager;
pub mod slot;
pub mod sweeper;

// Re-export main public API
pub use config::CacheConfig;
pub use inflight::{InFlight, InFlightGuard};
pub use manager::CacheSlots;
pub use slot::{CacheSlot, SlotStatus};
pub use sweeper::{BackgroundTasks, ExpirySweeper};
