//! Binary wire codec.
//!
//! Every message travels inside a [`frame`] envelope: two sync bytes, a type
//! code, a 48-bit timestamp, a source id, a body length, the body and a
//! CRC-32 trailer. All integers are little-endian.
//!
//! - `bytes.rs`   - Little-endian readers and writers
//! - `frame.rs`   - Envelope encode/decode and stream framing
//! - `types.rs`   - Type codes and enumerated body fields
//! - `message.rs` - `Message`/`Packet` and per-type dispatch
//! - `control.rs`, `race.rs`, `boat.rs`, `event.rs`, `wind.rs` - Body layouts

pub mod boat;
pub mod bytes;
pub mod control;
pub mod error;
pub mod event;
pub mod frame;
pub mod message;
pub mod race;
pub mod types;
pub mod wind;

pub use boat::{BoatLocation, BoatState};
pub use control::{BoatAction, Heartbeat, JoinAcceptance, RequestToJoin};
pub use error::{DecodeError, EncodeError, FrameError};
pub use event::{MarkRounding, YachtEvent};
pub use frame::{read_frame, RawFrame};
pub use message::{decode, encode, Message, Packet, WireBody};
pub use race::{BoatStatusRecord, RaceStartStatus, RaceStatus, XmlMessage};
pub use types::*;
pub use wind::{AverageWind, CourseWind, CourseWinds, WindAverage};
