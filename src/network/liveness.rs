//! Consecutive-failure counting for the liveness sweep.

use std::collections::BTreeMap;

/// Session identifier assigned by the acceptor.
pub type SessionId = u64;

/// Counts consecutive failed liveness checks per session.
///
/// A session is due for eviction once its count exceeds the tolerance; a
/// single passing check resets it.
#[derive(Debug)]
pub struct LivenessTracker {
    max_failures: u32,
    failures: BTreeMap<SessionId, u32>,
}

impl LivenessTracker {
    /// Tolerate `max_failures` consecutive failed sweeps.
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures,
            failures: BTreeMap::new(),
        }
    }

    /// Record one sweep result. Returns `true` when the session should be
    /// evicted.
    pub fn record(&mut self, session: SessionId, alive: bool) -> bool {
        if alive {
            self.failures.remove(&session);
            return false;
        }
        let count = self.failures.entry(session).or_insert(0);
        *count += 1;
        *count > self.max_failures
    }

    /// Current failure count.
    pub fn failures(&self, session: SessionId) -> u32 {
        self.failures.get(&session).copied().unwrap_or(0)
    }

    /// Stop tracking a session.
    pub fn forget(&mut self, session: SessionId) {
        self.failures.remove(&session);
    }

    /// Drop counters for sessions no longer registered.
    pub fn retain(&mut self, mut live: impl FnMut(SessionId) -> bool) {
        self.failures.retain(|id, _| live(*id));
    }
}
