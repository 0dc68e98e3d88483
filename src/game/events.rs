//! Race Events
//!
//! Events generated during simulation. They ride along with each snapshot
//! and are turned into mark rounding and yacht event messages for clients.

use serde::{Deserialize, Serialize};

use crate::codec::RaceStatusKind;
use crate::game::state::SourceId;

/// What a boat hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Obstacle {
    /// Another boat.
    Boat(SourceId),
    /// A course mark.
    Mark(SourceId),
}

/// Event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RaceEventData {
    /// A boat was put on the start line.
    BoatJoined {
        /// Boat id.
        source_id: SourceId,
        /// Ghost boats never collide.
        ghost: bool,
    },

    /// A boat left the race.
    BoatLeft {
        /// Boat id.
        source_id: SourceId,
    },

    /// Race phase changed.
    StatusChanged {
        /// Phase before the tick.
        old: RaceStatusKind,
        /// Phase after the tick.
        new: RaceStatusKind,
    },

    /// A boat rounded the compound mark ending a leg.
    MarkRounded {
        /// Boat id.
        source_id: SourceId,
        /// Compound mark rounded.
        compound_mark_id: u8,
        /// The compound mark is a gate.
        gate: bool,
        /// Leg just completed.
        leg: usize,
    },

    /// A boat collided.
    Collision {
        /// Boat that hit something.
        source_id: SourceId,
        /// Incident number for the report.
        incident_id: u32,
        /// What it hit.
        obstacle: Obstacle,
    },

    /// A boat crossed the finish.
    BoatFinished {
        /// Boat id.
        source_id: SourceId,
    },
}

/// A race event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    /// Tick when the event occurred.
    pub tick: u32,

    /// Event data.
    pub data: RaceEventData,

    /// Acknowledgement number of the client message reporting this event.
    /// Stamped once before the snapshot is published so every client sees
    /// the same number.
    pub ack: u16,
}

impl RaceEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: RaceEventData) -> Self {
        Self { tick, data, ack: 0 }
    }

    /// Reported to clients as a message of its own, which carries an ack.
    pub fn is_reported(&self) -> bool {
        matches!(
            self.data,
            RaceEventData::MarkRounded { .. } | RaceEventData::Collision { .. }
        )
    }

    /// Boat the event concerns, if any.
    pub fn source_id(&self) -> Option<SourceId> {
        match &self.data {
            RaceEventData::BoatJoined { source_id, .. }
            | RaceEventData::BoatLeft { source_id }
            | RaceEventData::MarkRounded { source_id, .. }
            | RaceEventData::Collision { source_id, .. }
            | RaceEventData::BoatFinished { source_id } => Some(*source_id),
            RaceEventData::StatusChanged { .. } => None,
        }
    }
}
