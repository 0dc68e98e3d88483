//! Race State Definitions
//!
//! Boats, their active command slots, and the race they belong to.
//! Boats live in a BTreeMap so every per-tick pass visits them in id order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::codec::{BoatStatus, RaceStatusKind, RaceType};
use crate::config::RaceConfig;
use crate::core::geo::GpsCoordinate;
use crate::core::rng::DeterministicRng;
use crate::game::allocator::SourceIdAllocator;
use crate::game::command::{AngularCommand, VelocityCommand};
use crate::game::course::Course;
use crate::game::events::{RaceEvent, RaceEventData};
use crate::game::polars::PolarTable;
use crate::game::wind::{Wind, WindModel};

/// Identifier shared by boats and marks on the wire.
pub type SourceId = u32;

/// Health every boat starts with.
pub const FULL_HEALTH: f64 = 100.0;

/// Spacing between boats on the start line, metres.
const START_SPACING_M: f64 = 25.0;

/// Distance boats wait behind the start line, metres.
const START_SETBACK_M: f64 = 40.0;

// =============================================================================
// BOAT
// =============================================================================

/// State of a single boat.
///
/// Only the engine mutates a boat: either by running a command or during
/// the per-tick integration step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Boat {
    /// Boat id.
    pub source_id: SourceId,

    /// Current position.
    pub position: GpsCoordinate,

    /// Heading, degrees in [0, 360).
    pub heading: f64,

    /// Speed through the water, knots.
    pub speed: f64,

    /// Sails powered up.
    pub sails_out: bool,

    /// Auto-VMG pilot engaged.
    pub auto_vmg: bool,

    /// Speed follows the polar table each tick.
    pub velocity_default: bool,

    /// Health, 0 to 100.
    pub health: f64,

    /// Leg being sailed, counted from zero.
    pub leg: usize,

    /// Race status of this boat.
    pub status: BoatStatus,

    /// Recovering from a collision.
    pub colliding: bool,

    /// Ghost boats never collide.
    pub ghost: bool,

    /// Milliseconds since the heading goal last changed.
    pub time_since_tack_change: u64,

    /// Time the boat finished, epoch ms.
    pub finish_time_ms: Option<u64>,

    /// Place on the start line, counted from the centre outwards.
    pub start_slot: usize,

    /// Active heading command.
    #[serde(skip)]
    pub angular: Option<AngularCommand>,

    /// Active speed command.
    #[serde(skip)]
    pub velocity: Option<VelocityCommand>,
}

impl Boat {
    /// Create a boat at rest.
    pub fn new(source_id: SourceId, position: GpsCoordinate, heading: f64) -> Self {
        Self {
            source_id,
            position,
            heading,
            speed: 0.0,
            sails_out: true,
            auto_vmg: false,
            velocity_default: true,
            health: FULL_HEALTH,
            leg: 0,
            status: BoatStatus::Prestart,
            colliding: false,
            ghost: false,
            time_since_tack_change: 0,
            finish_time_ms: None,
            start_slot: 0,
            angular: None,
            velocity: None,
        }
    }

    /// Replace the active heading command. Any previous one is dropped.
    pub fn attach_angular(&mut self, command: AngularCommand) {
        self.angular = Some(command);
    }

    /// Replace the active speed command. Any previous one is dropped.
    pub fn attach_velocity(&mut self, command: VelocityCommand) {
        self.velocity = Some(command);
    }

    /// Add `delta` to health, clamped to 0..=100.
    pub fn update_health(&mut self, delta: f64) {
        self.health = (self.health + delta).clamp(0.0, FULL_HEALTH);
    }

    /// Still taking part: waiting for the start or racing.
    pub fn is_active(&self) -> bool {
        matches!(self.status, BoatStatus::Prestart | BoatStatus::Racing)
    }

    /// On the course after the start.
    pub fn is_racing(&self) -> bool {
        self.status == BoatStatus::Racing
    }
}

// =============================================================================
// RACE STATE
// =============================================================================

/// Complete state of one race.
#[derive(Clone, Debug)]
pub struct RaceState {
    /// Race identifier.
    pub race_id: u32,

    /// Race format.
    pub race_type: RaceType,

    /// Race phase.
    pub status: RaceStatusKind,

    /// Current tick number.
    pub tick: u32,

    /// Time the race was created, epoch ms.
    pub created_ms: u64,

    /// Simulated time of the last tick, epoch ms.
    pub clock_ms: u64,

    /// Scheduled start, epoch ms.
    pub start_time_ms: u64,

    /// Time-to-start below which the race is in Warning, ms.
    pub warning_ms: u64,

    /// Time-to-start below which the race is Preparatory, ms.
    pub preparatory_ms: u64,

    /// Multiplier applied to distance sailed each tick.
    pub scale_factor: f64,

    /// Wind this tick.
    pub wind: Wind,

    /// How the wind evolves.
    pub wind_model: WindModel,

    /// Course being sailed.
    pub course: Course,

    /// Boat performance.
    pub polars: PolarTable,

    /// Boats by id.
    pub boats: BTreeMap<SourceId, Boat>,

    /// Boat id pool.
    pub allocator: SourceIdAllocator,

    /// Deterministic noise source.
    pub rng: DeterministicRng,

    next_incident_id: u32,

    events: Vec<RaceEvent>,
}

impl RaceState {
    /// Create a race from its configuration. `now_ms` is the creation time.
    pub fn new(config: &RaceConfig, now_ms: u64) -> Self {
        let polars = match &config.polars {
            Some(rows) => PolarTable::from_rows(rows.clone()),
            None => PolarTable::default(),
        };
        let wind = config.wind.at(0);

        Self {
            race_id: config.race_id,
            race_type: config.race_type,
            status: RaceStatusKind::Prestart,
            tick: 0,
            created_ms: now_ms,
            clock_ms: now_ms,
            start_time_ms: now_ms + config.start_delay_ms,
            warning_ms: config.warning_ms,
            preparatory_ms: config.preparatory_ms,
            scale_factor: config.scale_factor,
            wind,
            wind_model: config.wind.clone(),
            allocator: SourceIdAllocator::new(config.course.participants.iter().copied()),
            course: config.course.clone(),
            polars,
            boats: BTreeMap::new(),
            rng: DeterministicRng::new(config.seed),
            next_incident_id: 1,
            events: Vec::new(),
        }
    }

    /// Milliseconds since the race was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock_ms.saturating_sub(self.created_ms)
    }

    /// Milliseconds until the start; negative once started.
    pub fn time_to_start_ms(&self) -> i64 {
        self.start_time_ms as i64 - self.clock_ms as i64
    }

    /// Race phase implied by the current clock.
    pub fn scheduled_status(&self) -> RaceStatusKind {
        let remaining = self.time_to_start_ms();
        if remaining > self.warning_ms as i64 {
            RaceStatusKind::Prestart
        } else if remaining > self.preparatory_ms as i64 {
            RaceStatusKind::Warning
        } else if remaining > 0 {
            RaceStatusKind::Preparatory
        } else {
            RaceStatusKind::Started
        }
    }

    /// New boats may only join before the preparatory signal.
    pub fn is_accepting_boats(&self) -> bool {
        matches!(self.status, RaceStatusKind::Prestart | RaceStatusKind::Warning)
    }

    /// Put a boat on the start line. The id must come from the allocator.
    pub fn add_boat(&mut self, source_id: SourceId, ghost: bool) {
        let slot = self.free_start_slot();
        let (position, heading) = self.start_position(slot);
        let mut boat = Boat::new(source_id, position, heading);
        boat.ghost = ghost;
        boat.start_slot = slot;
        self.boats.insert(source_id, boat);

        let tick = self.tick;
        self.push_event(RaceEvent::new(tick, RaceEventData::BoatJoined { source_id, ghost }));
    }

    /// Retire a boat that left the race and return its id to the pool.
    pub fn retire_boat(&mut self, source_id: SourceId) -> bool {
        let Some(boat) = self.boats.get_mut(&source_id) else {
            return false;
        };
        if boat.is_active() {
            boat.status = BoatStatus::DidNotFinish;
        }
        boat.angular = None;
        boat.velocity = None;
        self.allocator.release(source_id);

        let tick = self.tick;
        self.push_event(RaceEvent::new(tick, RaceEventData::BoatLeft { source_id }));
        true
    }

    /// Get boat by id.
    pub fn get_boat(&self, id: SourceId) -> Option<&Boat> {
        self.boats.get(&id)
    }

    /// Get mutable boat by id.
    pub fn get_boat_mut(&mut self, id: SourceId) -> Option<&mut Boat> {
        self.boats.get_mut(&id)
    }

    /// Boats still waiting or racing.
    pub fn active_boat_count(&self) -> usize {
        self.boats.values().filter(|b| b.is_active()).count()
    }

    /// Next incident id for collision reports.
    pub fn next_incident_id(&mut self) -> u32 {
        let id = self.next_incident_id;
        self.next_incident_id = self.next_incident_id.wrapping_add(1);
        id
    }

    /// Take all events generated since the last call.
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Record an event.
    pub fn push_event(&mut self, event: RaceEvent) {
        self.events.push(event);
    }

    /// Lowest start slot not held by a boat still in the race. Retired boats
    /// give their slot back.
    fn free_start_slot(&self) -> usize {
        let taken: BTreeSet<usize> = self
            .boats
            .values()
            .filter(|b| b.is_active())
            .map(|b| b.start_slot)
            .collect();
        (0..).find(|slot| !taken.contains(slot)).unwrap_or(taken.len())
    }

    /// Position for a start slot: spread along the line, set back from it,
    /// pointing at the first mark.
    fn start_position(&mut self, slot: usize) -> (GpsCoordinate, f64) {
        let Some(start) = self.course.start() else {
            return (GpsCoordinate::default(), self.wind.direction);
        };
        let center = start.center();
        let heading = self
            .course
            .leg_end(0)
            .map(|mark| center.bearing_to(&mark.center()))
            .unwrap_or(self.wind.direction);

        let side = if slot % 2 == 0 { 1.0 } else { -1.0 };
        let along = side * START_SPACING_M * ((slot as f64 + 1.0) / 2.0).floor();
        let jitter = self.rng.next_f64_range(-2.0, 2.0);

        let behind = center.destination(START_SETBACK_M + jitter, heading + 180.0);
        let abeam = if along >= 0.0 { heading + 90.0 } else { heading - 90.0 };
        (behind.destination(along.abs(), abeam), heading)
    }
}

// =============================================================================
// TESTS
// =============================================================================
