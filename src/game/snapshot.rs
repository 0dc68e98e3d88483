//! Immutable per-tick race snapshots.
//!
//! The simulation task is the only owner of [`RaceState`]; everything else
//! sees the race through these values, shared behind an `Arc`.

use serde::{Deserialize, Serialize};

use crate::codec::{BoatStatus, RaceStatusKind, RaceType};
use crate::core::geo::GpsCoordinate;
use crate::core::units::{angular_distance, normalize_degrees};
use crate::game::events::RaceEvent;
use crate::game::state::{Boat, RaceState, SourceId};
use crate::game::wind::Wind;

/// One boat as of a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoatSnapshot {
    /// Boat id.
    pub source_id: SourceId,
    /// Position at the end of the tick.
    pub position: GpsCoordinate,
    /// Heading, degrees.
    pub heading: f64,
    /// Knots.
    pub speed: f64,
    /// Health, 0 to 100.
    pub health: f64,
    /// Race status of the boat.
    pub status: BoatStatus,
    /// Leg being sailed, counted from zero.
    pub leg: usize,
    /// Sails powered up.
    pub sails_out: bool,
    /// Auto-VMG pilot engaged.
    pub auto_vmg: bool,
    /// Recovering from a collision.
    pub colliding: bool,
    /// Estimated arrival at the end of the current leg, epoch ms. Zero when
    /// unknown.
    pub estimated_next_mark_ms: u64,
}

/// One mark as of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkSnapshot {
    /// Mark id.
    pub source_id: SourceId,
    /// Where the mark is laid.
    pub position: GpsCoordinate,
}

/// Everything clients learn about one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    /// Tick that produced this snapshot.
    pub tick: u32,
    /// Simulated time, epoch ms.
    pub time_ms: u64,
    /// Race identifier.
    pub race_id: u32,
    /// Fleet or match race.
    pub race_type: RaceType,
    /// Race phase.
    pub status: RaceStatusKind,
    /// Scheduled start, epoch ms.
    pub start_time_ms: u64,
    /// True wind over the course.
    pub wind: Wind,
    /// Best upwind true wind angle at this wind speed, degrees.
    pub best_upwind_angle: f64,
    /// Best downwind true wind angle at this wind speed, degrees.
    pub best_downwind_angle: f64,
    /// Boats in id order.
    pub boats: Vec<BoatSnapshot>,
    /// Every mark on the course.
    pub marks: Vec<MarkSnapshot>,
    /// Events raised during this tick.
    pub events: Vec<RaceEvent>,
}

impl RaceSnapshot {
    /// Capture the race along with the events of the tick just run.
    pub fn capture(state: &RaceState, events: Vec<RaceEvent>) -> Self {
        let wind = state.wind;
        let upwind = state.polars.best_vmg(wind.direction + 45.0, wind.direction, wind.speed);
        let downwind = state.polars.best_vmg(wind.direction + 135.0, wind.direction, wind.speed);

        Self {
            tick: state.tick,
            time_ms: state.clock_ms,
            race_id: state.race_id,
            race_type: state.race_type,
            status: state.status,
            start_time_ms: state.start_time_ms,
            wind,
            best_upwind_angle: angular_distance(upwind.heading, wind.direction),
            best_downwind_angle: angular_distance(downwind.heading, wind.direction),
            boats: state
                .boats
                .values()
                .map(|boat| boat_snapshot(state, boat))
                .collect(),
            marks: state
                .course
                .marks()
                .map(|mark| MarkSnapshot {
                    source_id: mark.source_id,
                    position: mark.position,
                })
                .collect(),
            events,
        }
    }

    /// Boat by id.
    pub fn boat(&self, source_id: SourceId) -> Option<&BoatSnapshot> {
        self.boats.iter().find(|b| b.source_id == source_id)
    }

    /// Apparent wind for a boat: speed in knots and angle off the bow in
    /// degrees, positive to starboard.
    pub fn apparent_wind(&self, boat: &BoatSnapshot) -> (f64, f64) {
        // Wind vector points where the wind blows to
        let to = (self.wind.direction + 180.0).to_radians();
        let heading = boat.heading.to_radians();
        let wx = self.wind.speed * to.sin() - boat.speed * heading.sin();
        let wy = self.wind.speed * to.cos() - boat.speed * heading.cos();
        let speed = wx.hypot(wy);
        if speed < f64::EPSILON {
            return (0.0, 0.0);
        }
        let from = normalize_degrees(wx.atan2(wy).to_degrees() + 180.0);
        let mut angle = normalize_degrees(from - boat.heading);
        if angle > 180.0 {
            angle -= 360.0;
        }
        (speed, angle)
    }
}

fn boat_snapshot(state: &RaceState, boat: &Boat) -> BoatSnapshot {
    let estimated_next_mark_ms = match state.course.leg_end(boat.leg) {
        Some(mark) if boat.is_racing() && boat.speed > 0.0 => {
            let metres = boat.position.distance_to(&mark.center());
            let metres_per_ms = boat.speed * crate::core::units::METERS_PER_NAUTICAL_MILE
                / crate::core::units::MILLIS_PER_HOUR;
            state.clock_ms + (metres / metres_per_ms) as u64
        }
        _ => 0,
    };

    BoatSnapshot {
        source_id: boat.source_id,
        position: boat.position,
        heading: boat.heading,
        speed: boat.speed,
        health: boat.health,
        status: boat.status,
        leg: boat.leg,
        sails_out: boat.sails_out,
        auto_vmg: boat.auto_vmg,
        colliding: boat.colliding,
        estimated_next_mark_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RaceConfig;

    #[test]
    fn test_capture_lists_boats_and_marks() {
        let mut state = RaceState::new(&RaceConfig::default(), 5_000);
        state.add_boat(122, false);
        state.add_boat(121, false);
        let events = state.take_events();
        let snapshot = RaceSnapshot::capture(&state, events);

        let ids: Vec<_> = snapshot.boats.iter().map(|b| b.source_id).collect();
        assert_eq!(ids, vec![121, 122]);
        assert_eq!(snapshot.marks.len(), 7);
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.time_ms, 5_000);
        assert!(snapshot.boat(121).is_some());
        assert!(snapshot.boat(500).is_none());
    }

    #[test]
    fn test_best_angles() {
        let state = RaceState::new(&RaceConfig::default(), 0);
        let snapshot = RaceSnapshot::capture(&state, Vec::new());
        assert!(snapshot.best_upwind_angle > 30.0 && snapshot.best_upwind_angle < 60.0);
        assert!(snapshot.best_downwind_angle > 120.0 && snapshot.best_downwind_angle <= 180.0);
    }

    #[test]
    fn test_apparent_wind_head_to_wind() {
        let state = RaceState::new(&RaceConfig::default(), 0);
        let mut snapshot = RaceSnapshot::capture(&state, Vec::new());
        snapshot.wind = Wind {
            direction: 0.0,
            speed: 10.0,
        };
        let boat = BoatSnapshot {
            source_id: 1,
            position: GpsCoordinate::default(),
            heading: 0.0,
            speed: 5.0,
            health: 100.0,
            status: BoatStatus::Racing,
            leg: 0,
            sails_out: true,
            auto_vmg: false,
            colliding: false,
            estimated_next_mark_ms: 0,
        };
        let (speed, angle) = snapshot.apparent_wind(&boat);
        assert!((speed - 15.0).abs() < 1e-9);
        assert!(angle.abs() < 1e-9);
    }
}
