//! Race Simulation Module
//!
//! All race simulation code. Nothing here performs I/O; the wall clock is
//! passed in by the caller.
//!
//! ## Module Structure
//!
//! - `course`: Marks, legs, boundary and the boat id pool
//! - `polars`: Boat speed by wind speed and angle
//! - `wind`: Wind models over elapsed time
//! - `state`: Race and boat state
//! - `command`: Boat commands, command slots and the command queue
//! - `collision`: Boat and mark contact
//! - `tick`: Authoritative simulation step
//! - `snapshot`: Immutable per-tick view for broadcast
//! - `engine`: Admission, command submission and stepping
//! - `events`: Race events

pub mod allocator;
pub mod collision;
pub mod command;
pub mod course;
pub mod engine;
pub mod events;
pub mod polars;
pub mod snapshot;
pub mod state;
pub mod tick;
pub mod wind;

// Re-export key types
pub use command::{Command, CommandError, CommandFactory, CommandKind, CommandQueue};
pub use course::{CompoundMark, Course, CourseDocument, CourseError, Mark};
pub use engine::{Admission, RaceEngine};
pub use events::{RaceEvent, RaceEventData};
pub use snapshot::{BoatSnapshot, MarkSnapshot, RaceSnapshot};
pub use state::{Boat, RaceState, SourceId};
pub use tick::TickResult;
pub use wind::{Wind, WindModel};
