//! Authoritative Simulation Tick
//!
//! One fixed-period step of the race. Everything that mutates boats or the
//! environment happens here, in a fixed order, on the simulation task.

use tracing::{debug, info};

use crate::codec::{BoatStatus, RaceStatusKind};
use crate::core::geo::is_inside_boundary;
use crate::core::units::{angular_distance, meters_travelled};
use crate::game::collision::{apply_collisions, detect_collisions};
use crate::game::command::{retarget_auto_vmg, update_slots, CommandQueue};
use crate::game::events::{RaceEvent, RaceEventData};
use crate::game::state::{Boat, RaceState};

/// Distance from a leg's end mark at which it counts as rounded, metres.
pub const ROUNDING_DISTANCE_M: f64 = 50.0;

/// Health lost per tick outside the course boundary.
pub const BOUNDARY_DAMAGE: f64 = 0.1;

/// How strongly lost health slows a boat.
pub const HEALTH_SPEED_EXPONENT: f64 = 0.3;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<RaceEvent>,
    /// Commands executed from the queue
    pub commands_executed: usize,
    /// Whether the race finished this tick
    pub race_finished: bool,
}

/// Run one simulation tick at wall time `now_ms`.
///
/// Order of work:
/// 1. queued commands run their one-shot step, oldest first
/// 2. race phase follows the clock
/// 3. wind is recomputed from elapsed time
/// 4. command slots advance
/// 5. positions integrate over the elapsed time
/// 6. boundary damage
/// 7. collisions
/// 8. mark roundings and finishes
/// 9. end-of-race check
pub fn tick(state: &mut RaceState, queue: &mut CommandQueue, now_ms: u64) -> TickResult {
    let mut result = TickResult::default();

    if state.status == RaceStatusKind::Finished {
        queue.execute_all(state);
        return result;
    }

    // 0. Advance the clock
    let elapsed = now_ms.saturating_sub(state.clock_ms);
    state.clock_ms = state.clock_ms.max(now_ms);
    state.tick += 1;

    // 1. Execute queued commands
    result.commands_executed = queue.execute_all(state);

    // 2. Race phase
    update_race_status(state);

    // 3. Wind
    state.wind = state.wind_model.at(state.elapsed_ms());

    // 4. Command slots
    update_commands(state);

    // 5. Integrate positions
    integrate_positions(state, elapsed);

    // 6. Boundary
    apply_boundary_damage(state);

    // 7. Collisions
    let collisions = detect_collisions(state);
    apply_collisions(state, &collisions);

    // 8. Legs and finishes
    process_roundings(state);

    // 9. End of race
    result.race_finished = check_race_finished(state);

    result.events = state.take_events();
    result
}

/// Move the race phase along with the clock. Boats start racing when the
/// race starts.
fn update_race_status(state: &mut RaceState) {
    let scheduled = state.scheduled_status();
    if scheduled == state.status {
        return;
    }

    let old = state.status;
    state.status = scheduled;
    info!(race_id = state.race_id, ?old, new = ?scheduled, "Race status changed");

    if scheduled == RaceStatusKind::Started {
        for boat in state.boats.values_mut() {
            if boat.status == BoatStatus::Prestart {
                boat.status = BoatStatus::Racing;
                boat.time_since_tack_change = 0;
            }
        }
    }

    let tick = state.tick;
    state.push_event(RaceEvent::new(
        tick,
        RaceEventData::StatusChanged { old, new: scheduled },
    ));
}

/// Auto-VMG retargeting, then one increment of every active slot.
fn update_commands(state: &mut RaceState) {
    let wind = state.wind;
    let polars = &state.polars;
    for boat in state.boats.values_mut() {
        if !boat.is_active() {
            continue;
        }
        retarget_auto_vmg(boat, &wind, polars);
        update_slots(boat);
    }
}

/// Sail every racing boat forward along its heading.
fn integrate_positions(state: &mut RaceState, elapsed_ms: u64) {
    let wind = state.wind;
    let polars = &state.polars;
    let scale = state.scale_factor;

    for boat in state.boats.values_mut() {
        if !boat.is_racing() || boat.colliding {
            continue;
        }

        if boat.velocity_default {
            let polar = polars.boat_speed(wind.speed, angular_distance(boat.heading, wind.direction));
            if polar > 0.0 {
                boat.speed = polar * health_factor(boat);
            }
        }

        let distance = meters_travelled(boat.speed, elapsed_ms) * scale;
        if distance > 0.0 {
            boat.position = boat.position.destination(distance, boat.heading);
        }
        boat.time_since_tack_change += elapsed_ms;
    }
}

/// Speed multiplier for a damaged boat.
fn health_factor(boat: &Boat) -> f64 {
    (boat.health / 100.0).powf(HEALTH_SPEED_EXPONENT)
}

fn apply_boundary_damage(state: &mut RaceState) {
    if state.course.boundary.len() < 3 {
        return;
    }
    let boundary = &state.course.boundary;
    for boat in state.boats.values_mut() {
        if boat.is_racing() && !is_inside_boundary(&boat.position, boundary) {
            boat.update_health(-BOUNDARY_DAMAGE);
        }
    }
}

/// Advance boats that reached the end of their leg.
fn process_roundings(state: &mut RaceState) {
    let mut rounded = Vec::new();
    for boat in state.boats.values() {
        if !boat.is_racing() {
            continue;
        }
        if let Some(mark) = state.course.leg_end(boat.leg) {
            if boat.position.distance_to(&mark.center()) <= ROUNDING_DISTANCE_M {
                rounded.push((boat.source_id, mark.id, mark.is_gate()));
            }
        }
    }

    let legs = state.course.leg_count();
    let tick = state.tick;
    let now = state.clock_ms;
    for (source_id, compound_mark_id, gate) in rounded {
        let Some(boat) = state.boats.get_mut(&source_id) else {
            continue;
        };
        let leg = boat.leg;
        boat.leg += 1;
        let finished = boat.leg >= legs;
        if finished {
            boat.status = BoatStatus::Finished;
            boat.finish_time_ms = Some(now);
            boat.angular = None;
            boat.velocity = None;
        }
        debug!(source_id, compound_mark_id, leg, "Mark rounded");

        state.push_event(RaceEvent::new(
            tick,
            RaceEventData::MarkRounded {
                source_id,
                compound_mark_id,
                gate,
                leg,
            },
        ));
        if finished {
            info!(source_id, "Boat finished");
            state.push_event(RaceEvent::new(tick, RaceEventData::BoatFinished { source_id }));
        }
    }
}

/// Once started, the race ends when no boat is still racing.
fn check_race_finished(state: &mut RaceState) -> bool {
    if state.status != RaceStatusKind::Started || state.active_boat_count() > 0 {
        return false;
    }
    state.status = RaceStatusKind::Finished;
    info!(race_id = state.race_id, "Race finished");
    let tick = state.tick;
    state.push_event(RaceEvent::new(
        tick,
        RaceEventData::StatusChanged {
            old: RaceStatusKind::Started,
            new: RaceStatusKind::Finished,
        },
    ));
    true
}

// =============================================================================
// TESTS
// =============================================================================
