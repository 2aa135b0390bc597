//! Lock manager — advisory, time-bounded mutual exclusion per device.
//!
//! A lock is visible for at most its declared duration; expired entries are
//! evicted lazily on the next lookup. Every acquisition also bumps a
//! per-device [`Generation`] that outlives the lock itself, so a delayed
//! verification can tell whether a newer command was issued in the meantime.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use powerhub_domain::id::DeviceId;

/// Sequence number of the command that acquired a device lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    acquired_at: Instant,
    duration: Duration,
    generation: Generation,
}

impl Lease {
    fn is_live(&self, now: Instant) -> bool {
        now.duration_since(self.acquired_at) < self.duration
    }
}

#[derive(Debug, Default)]
struct Inner {
    leases: HashMap<DeviceId, Lease>,
    generations: HashMap<DeviceId, Generation>,
}

impl Inner {
    fn live_lease(&mut self, id: DeviceId, now: Instant) -> Option<Lease> {
        match self.leases.get(&id) {
            Some(lease) if lease.is_live(now) => Some(*lease),
            Some(_) => {
                self.leases.remove(&id);
                None
            }
            None => None,
        }
    }

    fn install(&mut self, id: DeviceId, duration: Duration, now: Instant) -> Generation {
        let next = self
            .generations
            .get(&id)
            .map_or(Generation(1), |g| Generation(g.0 + 1));
        self.generations.insert(id, next);
        self.leases.insert(
            id,
            Lease {
                acquired_at: now,
                duration,
                generation: next,
            },
        );
        next
    }
}

/// In-process lock table shared by the command executor and the reconciler.
#[derive(Debug, Default)]
pub struct LockManager {
    inner: Mutex<Inner>,
}

impl LockManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        // The table holds no invariant a panicking holder could break halfway.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a live lock is held on `id`. Expired locks count as absent.
    #[must_use]
    pub fn is_locked(&self, id: DeviceId) -> bool {
        self.inner().live_lease(id, Instant::now()).is_some()
    }

    /// Install a lock unconditionally, overwriting any existing one.
    ///
    /// Callers are expected to have checked [`is_locked`](Self::is_locked);
    /// prefer [`try_acquire`](Self::try_acquire) which does both atomically.
    pub fn acquire(&self, id: DeviceId, duration: Duration) -> Generation {
        self.inner().install(id, duration, Instant::now())
    }

    /// Check-and-acquire under a single critical section.
    ///
    /// Returns `None` if a live lock is already held.
    pub fn try_acquire(&self, id: DeviceId, duration: Duration) -> Option<Generation> {
        let now = Instant::now();
        let mut inner = self.inner();
        if inner.live_lease(id, now).is_some() {
            return None;
        }
        Some(inner.install(id, duration, now))
    }

    /// Drop the lock on `id`. Idempotent.
    pub fn release(&self, id: DeviceId) {
        self.inner().leases.remove(&id);
    }

    /// Drop the lock on `id` only if it is still owned by `generation`.
    ///
    /// Returns whether a lock was removed.
    pub fn release_if_current(&self, id: DeviceId, generation: Generation) -> bool {
        let mut inner = self.inner();
        match inner.leases.get(&id) {
            Some(lease) if lease.generation == generation => {
                inner.leases.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Whether `generation` is the most recent one issued for `id`, whether
    /// or not its lock is still live.
    #[must_use]
    pub fn is_current(&self, id: DeviceId, generation: Generation) -> bool {
        self.inner().generations.get(&id) == Some(&generation)
    }
}
