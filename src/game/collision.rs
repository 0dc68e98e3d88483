//! Collision Detection
//!
//! Boats probe every mark and every other boat within a fixed radius.
//! Detection is a read-only pass over the race; [`apply_collisions`] then
//! applies health penalties and starts recovery.

use crate::core::geo::GpsCoordinate;
use crate::core::units::normalize_degrees;
use crate::game::command::VelocityCommand;
use crate::game::events::{Obstacle, RaceEvent, RaceEventData};
use crate::game::state::{RaceState, SourceId};

/// Contact radius, metres.
pub const COLLISION_DISTANCE_M: f64 = 15.0;

/// Health lost when hitting a boat ahead.
pub const BOAT_COLLISION_DAMAGE: f64 = 5.0;

/// Health lost when hitting a mark.
pub const MARK_COLLISION_DAMAGE: f64 = 10.0;

/// A contact found by [`detect_collisions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Boat that made contact.
    pub source_id: SourceId,
    /// What it touched.
    pub obstacle: Obstacle,
    /// Bearing of the obstacle relative to the boat's heading, degrees.
    pub relative_bearing: f64,
    /// Distance to the obstacle, metres.
    pub distance: f64,
}

impl Collision {
    /// Health this contact costs the boat.
    ///
    /// Boats only pay for hitting something in front of them.
    pub fn damage(&self) -> f64 {
        match self.obstacle {
            Obstacle::Mark(_) => MARK_COLLISION_DAMAGE,
            Obstacle::Boat(_) if is_ahead(self.relative_bearing) => BOAT_COLLISION_DAMAGE,
            Obstacle::Boat(_) => 0.0,
        }
    }
}

/// True for relative bearings in the forward half.
#[inline]
pub fn is_ahead(relative_bearing: f64) -> bool {
    relative_bearing > 270.0 || relative_bearing < 90.0
}

/// Probe `target` from a boat. Returns the relative bearing and distance
/// when within the contact radius.
pub fn ray_cast(
    position: &GpsCoordinate,
    heading: f64,
    target: &GpsCoordinate,
) -> Option<(f64, f64)> {
    let distance = position.distance_to(target);
    if distance > COLLISION_DISTANCE_M {
        return None;
    }
    let relative = normalize_degrees(position.bearing_to(target) - heading);
    Some((relative, distance))
}

/// Find the first contact for every racing boat that is not already
/// recovering. Marks are probed before boats.
///
/// Ghost boats neither collide nor can be hit.
pub fn detect_collisions(state: &RaceState) -> Vec<Collision> {
    let mut found = Vec::new();

    for boat in state.boats.values() {
        if !boat.is_racing() || boat.colliding || boat.ghost {
            continue;
        }

        let marks = state
            .course
            .marks()
            .map(|mark| (Obstacle::Mark(mark.source_id), mark.position));
        let others = state
            .boats
            .values()
            .filter(|other| other.source_id != boat.source_id && other.is_racing() && !other.ghost)
            .map(|other| (Obstacle::Boat(other.source_id), other.position));

        let hit = marks.chain(others).find_map(|(obstacle, position)| {
            ray_cast(&boat.position, boat.heading, &position).map(|(relative_bearing, distance)| {
                Collision {
                    source_id: boat.source_id,
                    obstacle,
                    relative_bearing,
                    distance,
                }
            })
        });
        found.extend(hit);
    }

    found
}

/// Apply contacts: damage, the colliding flag, recovery and an event each.
pub fn apply_collisions(state: &mut RaceState, collisions: &[Collision]) {
    for collision in collisions {
        let incident_id = state.next_incident_id();
        let Some(boat) = state.get_boat_mut(collision.source_id) else {
            continue;
        };

        boat.update_health(-collision.damage());
        boat.colliding = true;
        boat.velocity_default = false;
        let recovery = VelocityCommand::recovery(boat);
        boat.attach_velocity(recovery);

        let tick = state.tick;
        state.push_event(RaceEvent::new(
            tick,
            RaceEventData::Collision {
                source_id: collision.source_id,
                incident_id,
                obstacle: collision.obstacle,
            },
        ));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BoatStatus;
    use crate::config::RaceConfig;

    fn racing(state: &mut RaceState, id: SourceId, position: GpsCoordinate, heading: f64) {
        state.add_boat(id, false);
        let boat = state.get_boat_mut(id).unwrap();
        boat.position = position;
        boat.heading = heading;
        boat.status = BoatStatus::Racing;
    }

    fn open_water() -> GpsCoordinate {
        GpsCoordinate::new(-36.8350, 174.7650)
    }

    #[test]
    fn test_ray_cast_radius() {
        let origin = open_water();
        let near = origin.destination(10.0, 0.0);
        let far = origin.destination(20.0, 0.0);
        let (relative, distance) = ray_cast(&origin, 90.0, &near).unwrap();
        assert!((distance - 10.0).abs() < 0.01);
        assert!((relative - 270.0).abs() < 0.01);
        assert!(ray_cast(&origin, 0.0, &far).is_none());
    }

    #[test]
    fn test_boat_ahead_costs_health() {
        let mut state = RaceState::new(&RaceConfig::default(), 0);
        let origin = open_water();
        racing(&mut state, 121, origin, 0.0);
        racing(&mut state, 122, origin.destination(10.0, 0.0), 0.0);

        let collisions = detect_collisions(&state);
        assert_eq!(collisions.len(), 2);
        apply_collisions(&mut state, &collisions);

        // 121 ran into 122 from behind
        assert_eq!(state.get_boat(121).unwrap().health, 95.0);
        assert_eq!(state.get_boat(122).unwrap().health, 100.0);
        for id in [121, 122] {
            let boat = state.get_boat(id).unwrap();
            assert!(boat.colliding);
            assert!(matches!(boat.velocity, Some(VelocityCommand::CollisionRecovery { .. })));
        }
        let events = state.take_events();
        let collisions = events
            .iter()
            .filter(|e| matches!(e.data, RaceEventData::Collision { .. }))
            .count();
        assert_eq!(collisions, 2);
    }

    #[test]
    fn test_mark_costs_ten() {
        let mut state = RaceState::new(&RaceConfig::default(), 0);
        let mark = state.course.marks().next().unwrap().position;
        racing(&mut state, 121, mark.destination(5.0, 180.0), 0.0);

        let collisions = detect_collisions(&state);
        assert_eq!(collisions.len(), 1);
        assert!(matches!(collisions[0].obstacle, Obstacle::Mark(101)));
        apply_collisions(&mut state, &collisions);
        assert_eq!(state.get_boat(121).unwrap().health, 90.0);
    }

    #[test]
    fn test_recovering_and_ghost_boats_are_skipped() {
        let mut state = RaceState::new(&RaceConfig::default(), 0);
        let origin = open_water();
        racing(&mut state, 121, origin, 0.0);
        racing(&mut state, 122, origin.destination(10.0, 0.0), 0.0);
        state.get_boat_mut(121).unwrap().colliding = true;
        state.get_boat_mut(122).unwrap().ghost = true;
        assert!(detect_collisions(&state).is_empty());
    }

    #[test]
    fn test_separated_boats_do_not_collide() {
        let mut state = RaceState::new(&RaceConfig::default(), 0);
        let origin = open_water();
        racing(&mut state, 121, origin, 0.0);
        racing(&mut state, 122, origin.destination(40.0, 90.0), 0.0);
        assert!(detect_collisions(&state).is_empty());
    }
}
