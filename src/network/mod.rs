//! Network Layer
//!
//! TCP server for race clients. This layer is **non-deterministic**: it
//! only moves frames and forwards requests; all race logic runs in `game/`
//! on the simulation task.
//!
//! ## Module Structure
//!
//! - `server`: Acceptor, session registry and liveness sweep
//! - `session`: Per-client read and write pumps
//! - `handshake`: Join state machine
//! - `router`: Inbound message dispatch by handshake state
//! - `heartbeat`: Last-seen tracking and outgoing heartbeats
//! - `liveness`: Consecutive-failure counting
//! - `simulation`: The fixed-period task that owns the race
//! - `broadcast`: Snapshot to wire message conversion
//! - `context`: State shared by every session

pub mod broadcast;
pub mod context;
pub mod handshake;
pub mod heartbeat;
pub mod liveness;
pub mod router;
pub mod server;
pub mod session;
pub mod simulation;

pub use context::{now_millis, AckSequencer, ServerContext};
pub use handshake::{ConnectionState, Handshake, HandshakeError};
pub use server::{RaceServer, ServerError, ServerHandle};
pub use session::{ClientSession, SessionError, SessionHandle};
pub use simulation::EngineInput;
