//! Race engine: the race state plus its command queue.
//!
//! This is the whole of the simulation as seen from the server: boats are
//! admitted and retired, client actions are turned into commands, and each
//! [`RaceEngine::step`] runs one tick and returns the snapshot to publish.

use tracing::{debug, info};

use crate::codec::{BoatActionKind, JoinAcceptanceKind, JoinRole};
use crate::config::RaceConfig;
use crate::game::command::{CommandError, CommandFactory, CommandQueue};
use crate::game::course::CourseError;
use crate::game::snapshot::RaceSnapshot;
use crate::game::state::{RaceState, SourceId};
use crate::game::tick::tick;

/// Outcome of a join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
    /// Answer sent back to the client.
    pub kind: JoinAcceptanceKind,
    /// Boat bound to the client; zero when there is none.
    pub source_id: SourceId,
}

impl Admission {
    fn refused(kind: JoinAcceptanceKind) -> Self {
        Self { kind, source_id: 0 }
    }

    /// A boat was bound to the client.
    pub fn boat(&self) -> Option<SourceId> {
        self.kind.has_boat().then_some(self.source_id)
    }
}

/// The authoritative race.
#[derive(Debug)]
pub struct RaceEngine {
    state: RaceState,
    queue: CommandQueue,
}

impl RaceEngine {
    /// Create a race starting `config.start_delay_ms` after `now_ms`.
    pub fn new(config: &RaceConfig, now_ms: u64) -> Result<Self, CourseError> {
        config.course.validate()?;
        Ok(Self {
            state: RaceState::new(config, now_ms),
            queue: CommandQueue::new(),
        })
    }

    /// Read-only view of the race.
    pub fn state(&self) -> &RaceState {
        &self.state
    }

    /// Decide a join request, putting a boat on the start line for sailing
    /// roles.
    ///
    /// Boats are only admitted before the preparatory signal. When every
    /// boat id is taken the answer is `ServerFull`.
    pub fn admit(&mut self, role: JoinRole) -> Admission {
        let (kind, ghost) = match role {
            JoinRole::Spectator => return Admission::refused(JoinAcceptanceKind::Spectator),
            JoinRole::Participant => (JoinAcceptanceKind::Participant, false),
            JoinRole::ControlTutorial => (JoinAcceptanceKind::Tutorial, false),
            JoinRole::Ghost => (JoinAcceptanceKind::Ghost, true),
        };

        if !self.state.is_accepting_boats() {
            debug!(?role, status = ?self.state.status, "Join refused, race under way");
            return Admission::refused(JoinAcceptanceKind::JoinFailure);
        }
        let Some(source_id) = self.state.allocator.allocate() else {
            debug!(?role, "Join refused, no boats left");
            return Admission::refused(JoinAcceptanceKind::ServerFull);
        };

        self.state.add_boat(source_id, ghost);
        info!(source_id, ?role, "Boat admitted");
        Admission { kind, source_id }
    }

    /// Retire a boat whose client went away.
    pub fn leave(&mut self, source_id: SourceId) -> bool {
        let retired = self.state.retire_boat(source_id);
        if retired {
            info!(source_id, "Boat retired");
        }
        retired
    }

    /// Queue a client action for the next tick.
    ///
    /// Returns `Ok(false)` for actions with no server-side effect.
    pub fn submit(&mut self, source_id: SourceId, action: BoatActionKind) -> Result<bool, CommandError> {
        match CommandFactory::create(&self.state, source_id, action)? {
            Some(command) => {
                self.queue.push(command);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one tick and capture the result.
    pub fn step(&mut self, now_ms: u64) -> RaceSnapshot {
        let result = tick(&mut self.state, &mut self.queue, now_ms);
        RaceSnapshot::capture(&self.state, result.events)
    }

    /// Capture the race without running a tick.
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot::capture(&self.state, Vec::new())
    }
}
