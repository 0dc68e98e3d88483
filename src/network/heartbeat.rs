//! Heartbeat bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::codec::Heartbeat;

/// Tracks when a peer was last heard from.
///
/// Clones share the same timestamp: the session records, the sweeper reads.
#[derive(Clone, Debug)]
pub struct HeartbeatMonitor {
    last_seen: Arc<AtomicU64>,
    threshold_ms: u64,
}

impl HeartbeatMonitor {
    /// A peer first seen at `now_ms`.
    pub fn new(now_ms: u64, threshold_ms: u64) -> Self {
        Self {
            last_seen: Arc::new(AtomicU64::new(now_ms)),
            threshold_ms,
        }
    }

    /// The peer sent a heartbeat at `now_ms`.
    pub fn record(&self, now_ms: u64) {
        self.last_seen.fetch_max(now_ms, Ordering::Relaxed);
    }

    /// Last time the peer was heard from, epoch ms.
    pub fn last_seen(&self) -> u64 {
        self.last_seen.load(Ordering::Relaxed)
    }

    /// Alive while the silence is shorter than the threshold.
    pub fn is_alive(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_seen()) < self.threshold_ms
    }
}

/// Produces the server's outgoing heartbeats for one session.
#[derive(Debug, Default)]
pub struct HeartbeatEmitter {
    sequence: u32,
}

impl HeartbeatEmitter {
    /// Next heartbeat, numbered from zero.
    pub fn next(&mut self) -> Heartbeat {
        let heartbeat = Heartbeat {
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);
        heartbeat
    }
}
