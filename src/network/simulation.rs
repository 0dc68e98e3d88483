//! Simulation task.
//!
//! The only task that touches the race. It drains its input channel once
//! per frame, steps the engine and publishes the resulting snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::{BoatActionKind, JoinRole};
use crate::game::{Admission, RaceEngine, RaceSnapshot, SourceId};
use crate::network::broadcast::stamp_event_acks;
use crate::network::context::{now_millis, AckSequencer};

/// Requests from sessions to the simulation task.
#[derive(Debug)]
pub enum EngineInput {
    /// A connected client's control action.
    Action {
        /// Boat bound to the client.
        source_id: SourceId,
        /// What the client asked for.
        action: BoatActionKind,
    },
    /// A join request awaiting a decision.
    Join {
        /// Requested role.
        role: JoinRole,
        /// Where to send the decision.
        reply: oneshot::Sender<Admission>,
    },
    /// A client with a boat went away.
    Leave {
        /// Boat to retire.
        source_id: SourceId,
    },
}

/// Apply one input to the engine.
pub fn apply_input(engine: &mut RaceEngine, input: EngineInput) {
    match input {
        EngineInput::Action { source_id, action } => {
            if let Err(e) = engine.submit(source_id, action) {
                warn!(source_id, ?action, "Command rejected: {}", e);
            }
        }
        EngineInput::Join { role, reply } => {
            let admission = engine.admit(role);
            // The client may have gone while waiting; give the boat back
            if let Err(admission) = reply.send(admission) {
                if let Some(source_id) = admission.boat() {
                    debug!(source_id, "Joining client vanished");
                    engine.leave(source_id);
                }
            }
        }
        EngineInput::Leave { source_id } => {
            engine.leave(source_id);
        }
    }
}

/// Run the fixed-period simulation loop until cancelled.
#[instrument(skip_all)]
pub async fn run_simulation(
    mut engine: RaceEngine,
    mut inputs: mpsc::Receiver<EngineInput>,
    snapshots: broadcast::Sender<Arc<RaceSnapshot>>,
    acks: Arc<AckSequencer>,
    frame_period: Duration,
    cancel: CancellationToken,
) {
    let mut frame = interval(frame_period);
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(race_id = engine.state().race_id, "Simulation started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = frame.tick() => {}
        }

        // Inputs that arrived since the last frame, in arrival order
        while let Ok(input) = inputs.try_recv() {
            apply_input(&mut engine, input);
        }

        let mut snapshot = engine.step(now_millis());
        stamp_event_acks(&mut snapshot, &acks);
        // No subscribers is fine
        let _ = snapshots.send(Arc::new(snapshot));
    }

    info!("Simulation stopped");
}
