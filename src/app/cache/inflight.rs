//! In-flight acquisition gate
//!
//! Concurrent misses for the same fingerprint are coalesced: the first
//! request to enter the gate performs the acquisition, later ones wait on the
//! same per-fingerprint lock and re-check the slot once it is released.
//! Requests for different fingerprints never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::app::fingerprint::Fingerprint;

type Gate = Arc<AsyncMutex<()>>;

/// Per-fingerprint acquisition locks
#[derive(Debug, Default)]
pub struct InFlight {
    gates: Mutex<HashMap<Fingerprint, Gate>>,
}

/// Exclusive right to acquire a fingerprint, released on drop
///
/// Owns its [`InFlight`] so it can move into a spawned task.
#[derive(Debug)]
pub struct InFlightGuard {
    owner: Arc<InFlight>,
    fingerprint: Fingerprint,
    gate: Gate,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InFlight {
    /// Create an empty gate map
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request is acquiring `fingerprint`, then claim it
    pub async fn enter(self: &Arc<Self>, fingerprint: Fingerprint) -> InFlightGuard {
        let gate = {
            let mut gates = self.lock_gates();
            gates.entry(fingerprint).or_default().clone()
        };

        if gate.try_lock().is_err() {
            debug!("Waiting for in-flight acquisition of {}", fingerprint);
        }
        let guard = gate.clone().lock_owned().await;

        InFlightGuard {
            owner: Arc::clone(self),
            fingerprint,
            gate,
            guard: Some(guard),
        }
    }

    /// Whether any request currently holds or waits on `fingerprint`
    pub fn is_in_flight(&self, fingerprint: &Fingerprint) -> bool {
        self.lock_gates().contains_key(fingerprint)
    }

    /// Number of fingerprints with holders or waiters
    pub fn len(&self) -> usize {
        self.lock_gates().len()
    }

    /// Whether no acquisition is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the map, dropping gates nobody holds or waits on
    ///
    /// A waiter cancelled after the holder left cannot remove its own entry;
    /// once its handles are gone the map holds the only reference.
    fn lock_gates(&self) -> MutexGuard<'_, HashMap<Fingerprint, Gate>> {
        // The map stays consistent even if a holder panicked.
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        gates
    }
}

impl InFlightGuard {
    /// Fingerprint this guard holds
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut gates = self.owner.lock_gates();
        self.guard.take();
        // Map entry plus our handle: nobody else is waiting.
        if Arc::strong_count(&self.gate) <= 2 {
            gates.remove(&self.fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fingerprint::fingerprint;
    use crate::app::media::MediaKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_enter_and_release() {
        let inflight = Arc::new(InFlight::new());
        let fp = fingerprint("https://x/1", MediaKind::Video);

        {
            let guard = inflight.enter(fp).await;
            assert_eq!(guard.fingerprint(), &fp);
            assert!(inflight.is_in_flight(&fp));
        }

        assert!(!inflight.is_in_flight(&fp));
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_same_fingerprint_is_serialized() {
        let inflight = Arc::new(InFlight::new());
        let fp = fingerprint("https://x/1", MediaKind::Video);
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let inflight = inflight.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                let _guard = inflight.enter(fp).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_different_fingerprints_do_not_block() {
        let inflight = Arc::new(InFlight::new());
        let fp1 = fingerprint("https://x/1", MediaKind::Video);
        let fp2 = fingerprint("https://x/2", MediaKind::Video);

        let _first = inflight.enter(fp1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), inflight.enter(fp2)).await;

        assert!(second.is_ok());
        assert_eq!(inflight.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_entry() {
        let inflight = Arc::new(InFlight::new());
        let fp = fingerprint("https://x/1", MediaKind::Audio);

        let holder = inflight.enter(fp).await;
        let mut waiter = Box::pin(inflight.enter(fp));
        // Registered and parked behind the holder
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut waiter)
            .await
            .is_err());

        // Holder leaves while the waiter still counts, then the waiter is
        // dropped without ever being woken.
        drop(holder);
        drop(waiter);

        assert!(!inflight.is_in_flight(&fp));
        assert!(inflight.is_empty());

        let again = tokio::time::timeout(Duration::from_millis(100), inflight.enter(fp)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_guard_moves_into_task() {
        let inflight = Arc::new(InFlight::new());
        let fp = fingerprint("https://x/1", MediaKind::Video);

        let guard = inflight.enter(fp).await;
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(guard);
        });

        assert!(inflight.is_in_flight(&fp));
        task.await.unwrap();
        assert!(inflight.is_empty());
    }
}
