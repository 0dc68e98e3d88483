//! Process-wide server context.
//!
//! One [`ServerContext`] is created per server and shared by every session
//! behind an `Arc`. It carries the channels into and out of the simulation
//! task and the acknowledgement sequence.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::ServerConfig;
use crate::game::{CourseDocument, RaceSnapshot};
use crate::network::simulation::EngineInput;

/// Current wall time, epoch ms.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Source of acknowledgement numbers for outgoing messages.
#[derive(Debug, Default)]
pub struct AckSequencer {
    next: AtomicU32,
}

impl AckSequencer {
    /// Start counting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next acknowledgement number. Wraps at the 16-bit wire width.
    pub fn next(&self) -> u16 {
        (self.next.fetch_add(1, Ordering::Relaxed) & 0xFFFF) as u16
    }
}

/// State shared by the acceptor and every session.
#[derive(Debug)]
pub struct ServerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Race identifier.
    pub race_id: u32,
    /// Scheduled start, epoch ms.
    pub start_time_ms: u64,
    /// Course documents sent to clients after they join.
    pub documents: Vec<CourseDocument>,
    /// Acknowledgement numbers, shared with the simulation task.
    pub acks: Arc<AckSequencer>,
    /// Inputs to the simulation task.
    pub engine: mpsc::Sender<EngineInput>,
    /// Published snapshots.
    pub snapshots: broadcast::Sender<Arc<RaceSnapshot>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acks_increase_and_wrap() {
        let acks = AckSequencer::new();
        assert_eq!(acks.next(), 0);
        assert_eq!(acks.next(), 1);

        let acks = AckSequencer {
            next: AtomicU32::new(0xFFFF),
        };
        assert_eq!(acks.next(), 0xFFFF);
        assert_eq!(acks.next(), 0);
    }

    #[test]
    fn test_acks_are_unique_across_threads() {
        let acks = Arc::new(AckSequencer::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let acks = acks.clone();
                std::thread::spawn(move || (0..100).map(|_| acks.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u16> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_clock_is_epoch() {
        // 2020-01-01
        assert!(now_millis() > 1_577_836_800_000);
    }
}
