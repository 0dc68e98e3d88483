//! Boat Commands
//!
//! Client actions become [`Command`]s through [`CommandFactory`], wait in
//! the [`CommandQueue`] until the next tick, then run their one-shot
//! [`Command::execute`] step. Multi-tick work is left behind in the boat's
//! two command slots:
//!
//! - `angular`: heading changes ([`AngularCommand`])
//! - `velocity`: speed changes ([`VelocityCommand`])
//!
//! Each slot holds at most one command. Attaching a new one replaces the
//! old, so two commands never steer the same boat in one tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::codec::BoatActionKind;
use crate::core::geo::GpsCoordinate;
use crate::core::units::{angular_distance, normalize_degrees};
use crate::game::polars::PolarTable;
use crate::game::state::{Boat, RaceState, SourceId};
use crate::game::wind::Wind;

/// Degrees a turn advances per tick.
pub const TURN_RATE: f64 = 3.0;

/// Degrees an upwind/downwind nudge moves the heading.
pub const NUDGE_DEGREES: f64 = 3.0;

/// Knots a sail change moves the speed per tick.
pub const SAIL_ACCELERATION: f64 = 0.5;

/// Distance a colliding boat backs away per tick, metres.
pub const RECOVERY_STEP_M: f64 = 3.0;

/// Distance from the impact at which a colliding boat regains control, metres.
pub const RECOVERY_DISTANCE_M: f64 = 60.0;

/// Minimum time between auto-VMG heading changes, ms.
pub const VMG_RETARGET_MS: u64 = 1_000;

/// Command construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// No boat with this id is in the race.
    #[error("no boat with source id {0}")]
    BoatNotFound(SourceId),
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Closed set of commands a boat accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Toggle the auto-VMG pilot.
    Vmg,
    /// Luff the sails.
    SailsIn,
    /// Power up the sails.
    SailsOut,
    /// Flip the sails.
    ToggleSails,
    /// Tack or gybe through the wind.
    TackGybe,
    /// Head up towards the wind.
    Upwind,
    /// Bear away from the wind.
    Downwind,
}

impl CommandKind {
    /// Command for a client action. Camera actions have none.
    pub fn from_action(action: BoatActionKind) -> Option<Self> {
        match action {
            BoatActionKind::Vmg => Some(CommandKind::Vmg),
            BoatActionKind::SailsIn => Some(CommandKind::SailsIn),
            BoatActionKind::SailsOut => Some(CommandKind::SailsOut),
            BoatActionKind::ToggleSails => Some(CommandKind::ToggleSails),
            BoatActionKind::TackGybe => Some(CommandKind::TackGybe),
            BoatActionKind::Upwind => Some(CommandKind::Upwind),
            BoatActionKind::Downwind => Some(CommandKind::Downwind),
            BoatActionKind::ZoomIn | BoatActionKind::ZoomOut => None,
        }
    }
}

/// A command bound to one boat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// Target boat.
    pub source_id: SourceId,
    /// What to do.
    pub kind: CommandKind,
}

/// Builds commands from client actions.
pub struct CommandFactory;

impl CommandFactory {
    /// Build a command for `source_id`.
    ///
    /// Fails when the boat is not in the race. Actions with no server-side
    /// effect give `Ok(None)`.
    pub fn create(
        state: &RaceState,
        source_id: SourceId,
        action: BoatActionKind,
    ) -> Result<Option<Command>, CommandError> {
        if state.get_boat(source_id).is_none() {
            return Err(CommandError::BoatNotFound(source_id));
        }
        Ok(CommandKind::from_action(action).map(|kind| Command { source_id, kind }))
    }
}

impl Command {
    /// Run the one-shot step, attaching slot commands as needed.
    ///
    /// A boat that left the race since the command was built is skipped.
    pub fn execute(&self, state: &mut RaceState) {
        let wind = state.wind;
        let polars = &state.polars;
        let Some(boat) = state.boats.get_mut(&self.source_id) else {
            return;
        };
        if !boat.is_active() {
            return;
        }

        if self.kind != CommandKind::Vmg {
            boat.auto_vmg = false;
        }

        match self.kind {
            CommandKind::Vmg => {
                boat.auto_vmg = !boat.auto_vmg;
                if boat.auto_vmg {
                    steer_to_vmg(boat, &wind, polars);
                }
            }
            CommandKind::TackGybe => {
                let goal = tack_goal(boat.heading, wind.direction);
                boat.attach_angular(AngularCommand::Turn(Turn::towards(
                    boat.heading,
                    goal,
                    TurnReason::TackGybe,
                )));
            }
            CommandKind::Upwind => {
                boat.attach_angular(AngularCommand::Nudge {
                    offset: nudge_offset(boat.heading, wind.direction, true),
                });
            }
            CommandKind::Downwind => {
                boat.attach_angular(AngularCommand::Nudge {
                    offset: nudge_offset(boat.heading, wind.direction, false),
                });
            }
            CommandKind::SailsIn => set_sails(boat, false, &wind, polars),
            CommandKind::SailsOut => set_sails(boat, true, &wind, polars),
            CommandKind::ToggleSails => {
                let out = !boat.sails_out;
                set_sails(boat, out, &wind, polars);
            }
        }
        trace!(source_id = self.source_id, kind = ?self.kind, "Command executed");
    }
}

/// Heading mirrored across the wind axis.
///
/// Of the two headings at the same angle off the wind, pick the one that
/// is not the current heading.
pub fn tack_goal(heading: f64, wind_direction: f64) -> f64 {
    let off_wind = angular_distance(heading, wind_direction);
    let first = normalize_degrees(wind_direction + off_wind);
    let second = normalize_degrees(wind_direction - off_wind);
    if angular_distance(first, heading) < 1e-9 {
        second
    } else {
        first
    }
}

/// Signed nudge that turns towards (`upwind`) or away from the wind.
fn nudge_offset(heading: f64, wind_direction: f64, upwind: bool) -> f64 {
    // Positive when the wind is clockwise of the heading
    let towards_wind = if normalize_signed(wind_direction - heading) >= 0.0 {
        NUDGE_DEGREES
    } else {
        -NUDGE_DEGREES
    };
    if upwind {
        towards_wind
    } else {
        -towards_wind
    }
}

/// Fold an angle into (-180, 180].
fn normalize_signed(degrees: f64) -> f64 {
    let folded = normalize_degrees(degrees);
    if folded > 180.0 {
        folded - 360.0
    } else {
        folded
    }
}

fn steer_to_vmg(boat: &mut Boat, wind: &Wind, polars: &PolarTable) {
    if boat.time_since_tack_change <= VMG_RETARGET_MS {
        return;
    }
    let vmg = polars.best_vmg(boat.heading, wind.direction, wind.speed);
    boat.attach_angular(AngularCommand::Turn(Turn::towards(
        boat.heading,
        vmg.heading,
        TurnReason::Vmg,
    )));
    boat.time_since_tack_change = 0;
}

fn set_sails(boat: &mut Boat, out: bool, wind: &Wind, polars: &PolarTable) {
    boat.sails_out = out;
    boat.velocity_default = false;
    let goal = if out {
        polars.boat_speed(wind.speed, angular_distance(boat.heading, wind.direction))
    } else {
        0.0
    };
    boat.attach_velocity(VelocityCommand::Sails { goal, out });
}

/// Re-aim a boat on auto-VMG at the best heading for the current wind.
///
/// Does nothing while a heading command is running or the last change was
/// less than a second ago.
pub fn retarget_auto_vmg(boat: &mut Boat, wind: &Wind, polars: &PolarTable) {
    if boat.auto_vmg && boat.angular.is_none() {
        steer_to_vmg(boat, wind, polars);
    }
}

// =============================================================================
// SLOTS
// =============================================================================

/// Whether a slot command keeps running after an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    /// Keep the command attached.
    Active,
    /// Goal reached; detach.
    Done,
}

/// Why a turn was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnReason {
    /// Tack or gybe.
    TackGybe,
    /// Auto-VMG pilot.
    Vmg,
}

/// Incremental turn towards a goal heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Turn {
    /// Final heading.
    pub goal: f64,
    /// +1 clockwise, -1 anticlockwise.
    pub direction: f64,
    /// Total rotation required, degrees.
    pub rotation: f64,
    /// Rotation applied so far, degrees.
    pub rotated: f64,
    /// Why the turn was started.
    pub reason: TurnReason,
}

impl Turn {
    /// Plan the shorter turn from `heading` to `goal`. A half turn goes
    /// clockwise.
    pub fn towards(heading: f64, goal: f64, reason: TurnReason) -> Self {
        let goal = normalize_degrees(goal);
        let clockwise = normalize_degrees(goal - heading);
        let (rotation, direction) = if clockwise > 180.0 {
            (360.0 - clockwise, -1.0)
        } else {
            (clockwise, 1.0)
        };
        Self {
            goal,
            direction,
            rotation,
            rotated: 0.0,
            reason,
        }
    }
}

/// Active heading command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AngularCommand {
    /// Multi-tick turn.
    Turn(Turn),
    /// One-tick heading adjustment.
    Nudge {
        /// Signed change, degrees.
        offset: f64,
    },
}

impl AngularCommand {
    /// Advance one tick.
    pub fn update(&mut self, boat: &mut Boat) -> SlotStatus {
        match self {
            AngularCommand::Turn(turn) => {
                if turn.rotated < turn.rotation {
                    let step = TURN_RATE.min(turn.rotation - turn.rotated);
                    boat.heading = normalize_degrees(boat.heading + step * turn.direction);
                    turn.rotated += step;
                    SlotStatus::Active
                } else {
                    boat.heading = turn.goal;
                    SlotStatus::Done
                }
            }
            AngularCommand::Nudge { offset } => {
                boat.heading = normalize_degrees(boat.heading + *offset);
                SlotStatus::Done
            }
        }
    }
}

/// Active speed command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VelocityCommand {
    /// Ramp speed towards the sail setting's goal.
    Sails {
        /// Target speed, knots.
        goal: f64,
        /// Sails out (true) or in.
        out: bool,
    },
    /// Back away from an impact.
    CollisionRecovery {
        /// Where the collision happened.
        origin: GpsCoordinate,
        /// Direction to back away in, degrees.
        azimuth: f64,
    },
}

impl VelocityCommand {
    /// Recovery for a boat that just collided.
    pub fn recovery(boat: &Boat) -> Self {
        VelocityCommand::CollisionRecovery {
            origin: boat.position,
            azimuth: normalize_degrees(boat.heading - 180.0),
        }
    }

    /// Advance one tick.
    pub fn update(&mut self, boat: &mut Boat) -> SlotStatus {
        match *self {
            VelocityCommand::Sails { goal, out } => {
                // Sail changes wait until collision recovery is over
                if boat.colliding {
                    return SlotStatus::Active;
                }
                let gap = goal - boat.speed;
                if gap.abs() <= SAIL_ACCELERATION {
                    boat.speed = goal;
                    if out {
                        boat.velocity_default = true;
                    }
                    SlotStatus::Done
                } else {
                    boat.speed += SAIL_ACCELERATION * gap.signum();
                    SlotStatus::Active
                }
            }
            VelocityCommand::CollisionRecovery { origin, azimuth } => {
                if boat.position.distance_to(&origin) < RECOVERY_DISTANCE_M {
                    boat.position = boat.position.destination(RECOVERY_STEP_M, azimuth);
                    SlotStatus::Active
                } else {
                    boat.velocity_default = true;
                    boat.colliding = false;
                    SlotStatus::Done
                }
            }
        }
    }
}

/// Run both slot commands of a boat for one tick, detaching finished ones.
pub fn update_slots(boat: &mut Boat) {
    if let Some(mut command) = boat.angular.take() {
        if command.update(boat) == SlotStatus::Active && boat.angular.is_none() {
            boat.angular = Some(command);
        }
    }
    if let Some(mut command) = boat.velocity.take() {
        if command.update(boat) == SlotStatus::Active && boat.velocity.is_none() {
            boat.velocity = Some(command);
        }
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// FIFO of commands waiting for the next tick.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Pending commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Execute every pending command in arrival order and empty the queue.
    pub fn execute_all(&mut self, state: &mut RaceState) -> usize {
        let count = self.pending.len();
        while let Some(command) = self.pending.pop_front() {
            command.execute(state);
        }
        count
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
    use crate::game::wind::WindModel;

    fn race_with_wind(direction: f64) -> RaceState {
        let config = RaceConfig {
            wind: WindModel::Constant {
                wind: Wind {
                    direction,
                    speed: 12.0,
                },
            },
            ..RaceConfig::default()
        };
        let mut state = RaceState::new(&config, 0);
        state.add_boat(121, false);
        state.get_boat_mut(121).unwrap().status = BoatStatus::Racing;
        state
    }

    fn boat(state: &mut RaceState) -> &mut Boat {
        state.get_boat_mut(121).unwrap()
    }

    fn run(state: &mut RaceState, kind: CommandKind) {
        Command { source_id: 121, kind }.execute(state);
    }

    #[test]
    fn test_factory_rejects_unknown_boat() {
        let state = race_with_wind(0.0);
        assert_eq!(
            CommandFactory::create(&state, 999, BoatActionKind::TackGybe),
            Err(CommandError::BoatNotFound(999))
        );
        assert_eq!(
            CommandFactory::create(&state, 121, BoatActionKind::TackGybe),
            Ok(Some(Command {
                source_id: 121,
                kind: CommandKind::TackGybe
            }))
        );
        assert_eq!(CommandFactory::create(&state, 121, BoatActionKind::ZoomIn), Ok(None));
    }

    #[test]
    fn test_tack_goal_mirrors_across_wind() {
        assert!((tack_goal(90.0, 0.0) - 270.0).abs() < 1e-9);
        assert!((tack_goal(45.0, 0.0) - 315.0).abs() < 1e-9);
        assert!((tack_goal(315.0, 0.0) - 45.0).abs() < 1e-9);
        assert!((tack_goal(200.0, 180.0) - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_tack_from_beam_reach() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 90.0;
        run(&mut state, CommandKind::TackGybe);

        let Some(AngularCommand::Turn(turn)) = boat(&mut state).angular else {
            panic!("tack should attach a turn");
        };
        assert!((turn.goal - 270.0).abs() < 1e-9);
        assert_eq!(turn.direction, 1.0);
        assert!((turn.rotation - 180.0).abs() < 1e-9);

        let mut ticks = 0;
        while boat(&mut state).angular.is_some() {
            let before = boat(&mut state).heading;
            update_slots(boat(&mut state));
            let after = boat(&mut state).heading;
            assert!(angular_distance(before, after) <= TURN_RATE + 1e-9);
            ticks += 1;
            assert!(ticks < 100, "turn never finished");
        }
        assert!((boat(&mut state).heading - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_tack_takes_shorter_way() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 45.0;
        run(&mut state, CommandKind::TackGybe);
        let Some(AngularCommand::Turn(turn)) = boat(&mut state).angular else {
            panic!("tack should attach a turn");
        };
        assert_eq!(turn.direction, -1.0);
        assert!((turn.rotation - 90.0).abs() < 1e-9);

        update_slots(boat(&mut state));
        assert!((boat(&mut state).heading - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_second_tack_replaces_first() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 45.0;
        run(&mut state, CommandKind::TackGybe);
        for _ in 0..5 {
            update_slots(boat(&mut state));
        }
        run(&mut state, CommandKind::TackGybe);

        let heading = boat(&mut state).heading;
        let Some(AngularCommand::Turn(turn)) = boat(&mut state).angular else {
            panic!("second tack should be attached");
        };
        assert_eq!(turn.rotated, 0.0);
        assert!((turn.goal - tack_goal(heading, 0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_nudges_respect_wind_side() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 90.0;
        run(&mut state, CommandKind::Upwind);
        update_slots(boat(&mut state));
        assert!((boat(&mut state).heading - 87.0).abs() < 1e-9);
        assert!(boat(&mut state).angular.is_none());

        boat(&mut state).heading = 270.0;
        run(&mut state, CommandKind::Upwind);
        update_slots(boat(&mut state));
        assert!((boat(&mut state).heading - 273.0).abs() < 1e-9);

        run(&mut state, CommandKind::Downwind);
        update_slots(boat(&mut state));
        assert!((boat(&mut state).heading - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_sails_ramp_speed() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 90.0;
        boat(&mut state).speed = 2.0;
        run(&mut state, CommandKind::SailsIn);
        assert!(!boat(&mut state).sails_out);
        assert!(!boat(&mut state).velocity_default);

        update_slots(boat(&mut state));
        assert!((boat(&mut state).speed - 1.5).abs() < 1e-9);
        for _ in 0..10 {
            update_slots(boat(&mut state));
        }
        assert_eq!(boat(&mut state).speed, 0.0);
        assert!(boat(&mut state).velocity.is_none());
        assert!(!boat(&mut state).velocity_default);

        run(&mut state, CommandKind::ToggleSails);
        assert!(boat(&mut state).sails_out);
        for _ in 0..200 {
            update_slots(boat(&mut state));
        }
        assert!((boat(&mut state).speed - state.polars.boat_speed(12.0, 90.0)).abs() < 1e-9);
        assert!(boat(&mut state).velocity_default);
    }

    #[test]
    fn test_sails_wait_for_recovery() {
        let mut state = race_with_wind(0.0);
        run(&mut state, CommandKind::SailsIn);
        boat(&mut state).colliding = true;
        boat(&mut state).speed = 5.0;
        update_slots(boat(&mut state));
        assert_eq!(boat(&mut state).speed, 5.0);
        assert!(boat(&mut state).velocity.is_some());
    }

    #[test]
    fn test_collision_recovery_backs_away() {
        let mut state = race_with_wind(0.0);
        let b = boat(&mut state);
        b.heading = 0.0;
        b.colliding = true;
        b.velocity_default = false;
        let origin = b.position;
        let recovery = VelocityCommand::recovery(b);
        b.attach_velocity(recovery);

        let mut ticks = 0;
        while boat(&mut state).velocity.is_some() {
            update_slots(boat(&mut state));
            ticks += 1;
            assert!(ticks < 100, "recovery never finished");
        }
        let b = boat(&mut state);
        assert!(b.position.distance_to(&origin) >= RECOVERY_DISTANCE_M);
        assert!(b.position.latitude < origin.latitude, "should back off southwards");
        assert!(!b.colliding);
        assert!(b.velocity_default);
    }

    #[test]
    fn test_vmg_toggles_and_steers() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 60.0;
        boat(&mut state).time_since_tack_change = 5_000;
        run(&mut state, CommandKind::Vmg);
        assert!(boat(&mut state).auto_vmg);
        let Some(AngularCommand::Turn(turn)) = boat(&mut state).angular else {
            panic!("vmg should attach a turn");
        };
        assert_eq!(turn.reason, TurnReason::Vmg);
        assert!(turn.goal > 30.0 && turn.goal < 60.0);
        assert_eq!(boat(&mut state).time_since_tack_change, 0);

        run(&mut state, CommandKind::Vmg);
        assert!(!boat(&mut state).auto_vmg);
    }

    #[test]
    fn test_vmg_waits_after_recent_change() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).time_since_tack_change = 200;
        run(&mut state, CommandKind::Vmg);
        assert!(boat(&mut state).auto_vmg);
        assert!(boat(&mut state).angular.is_none());
    }

    #[test]
    fn test_other_commands_cancel_auto_vmg() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).auto_vmg = true;
        run(&mut state, CommandKind::Upwind);
        assert!(!boat(&mut state).auto_vmg);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut state = race_with_wind(0.0);
        boat(&mut state).heading = 90.0;
        let mut queue = CommandQueue::new();
        queue.push(Command { source_id: 121, kind: CommandKind::TackGybe });
        queue.push(Command { source_id: 121, kind: CommandKind::Upwind });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.execute_all(&mut state), 2);
        assert!(queue.is_empty());
        // The nudge arrived last, so it owns the heading slot
        assert!(matches!(boat(&mut state).angular, Some(AngularCommand::Nudge { .. })));
    }

    #[test]
    fn test_commands_skip_departed_boats() {
        let mut state = race_with_wind(0.0);
        let command = CommandFactory::create(&state, 121, BoatActionKind::TackGybe)
            .unwrap()
            .unwrap();
        state.retire_boat(121);
        command.execute(&mut state);
        assert!(state.get_boat(121).unwrap().angular.is_none());
    }
}
