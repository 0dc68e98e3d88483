//! Core primitives shared by the codec and the simulation.
//!
//! Nothing in here performs I/O or reads the clock.

pub mod geo;
pub mod rng;
pub mod units;

// Re-export core types
pub use geo::{is_inside_boundary, GpsCoordinate};
pub use rng::DeterministicRng;
pub use units::{angular_distance, normalize_degrees};
