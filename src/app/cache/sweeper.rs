//! Expiry sweeper background task
//!
//! The sweeper wakes on a fixed interval and asks every slot to evict its
//! resident if it has been idle past the threshold. Each slot is checked
//! under its own lock only, so a sweep never holds one slot's lock while
//! touching another and cannot deadlock with a concurrent replace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::cache;

use super::manager::CacheSlots;

/// Periodic idle-eviction task over a slot set
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    slots: Arc<CacheSlots>,
    interval: Duration,
    threshold: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper using the slot set's configured timing
    pub fn new(slots: Arc<CacheSlots>) -> Self {
        let interval = slots.config().sweep_interval;
        let threshold = slots.config().idle_threshold;
        Self {
            slots,
            interval,
            threshold,
        }
    }

    /// Run one pass over all slots as of `now`
    ///
    /// Returns the number of evicted residents.
    pub async fn sweep_once(&self, now: Instant) -> usize {
        let mut evicted = 0;
        for slot in self.slots.slots() {
            if slot.evict_if_idle(now, self.threshold).await {
                evicted += 1;
            }
        }
        evicted
    }

    /// Spawn the sweep loop, stopping when `shutdown_rx` fires
    pub fn spawn(self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = tokio::time::interval(self.interval);
            // The first tick completes immediately; nothing can be idle yet.
            sweep_interval.tick().await;

            info!(
                "Expiry sweeper started (interval {:?}, idle threshold {:?})",
                self.interval, self.threshold
            );

            loop {
                tokio::select! {
                    _ = sweep_interval.tick() => {
                        let evicted = self.sweep_once(Instant::now()).await;
                        if evicted > 0 {
                            info!("Expiry sweep evicted {} idle file(s)", evicted);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Expiry sweeper received shutdown signal");
                        break;
                    }
                }
            }
        })
    }
}

/// Background task manager for the sweeper and any future periodic tasks
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Create an empty task manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the expiry sweeper over `slots`
    pub fn start_expiry_sweeper(
        &mut self,
        slots: Arc<CacheSlots>,
        shutdown_rx: broadcast::Receiver<()>,
    ) {
        let task = ExpirySweeper::new(slots).spawn(shutdown_rx);
        self.tasks.push(task);
    }

    /// Number of managed tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every task to stop, bounded by the shutdown timeout
    pub async fn shutdown_all(self) {
        debug!("Initiating background task shutdown");

        for task in self.tasks {
            if tokio::time::timeout(cache::TASK_SHUTDOWN_TIMEOUT, task)
                .await
                .is_err()
            {
                warn!(
                    "Background task shutdown timed out after {:?}",
                    cache::TASK_SHUTDOWN_TIMEOUT
                );
            }
        }

        debug!("All background tasks shutdown complete");
    }
}
