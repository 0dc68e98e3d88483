//! # Regatta Race Server
//!
//! Authoritative sailing race simulation streamed to clients over a binary
//! TCP protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    REGATTA SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── units.rs    - Wire unit packing and angle helpers       │
//! │  ├── geo.rs      - GPS coordinates and boundaries            │
//! │  └── rng.rs      - Deterministic seeded PRNG                 │
//! │                                                              │
//! │  codec/          - Binary wire protocol                      │
//! │  ├── frame.rs    - Header, CRC-32 and stream framing         │
//! │  └── message.rs  - Closed message set and dispatch           │
//! │                                                              │
//! │  game/           - Race simulation (no I/O)                  │
//! │  ├── state.rs    - Race and boat state                       │
//! │  ├── command.rs  - Commands and per-boat slots               │
//! │  ├── tick.rs     - Authoritative simulation step             │
//! │  ├── collision.rs- Boat and mark contact                     │
//! │  └── engine.rs   - Admission, submission and stepping        │
//! │                                                              │
//! │  network/        - Networking                                │
//! │  ├── server.rs   - TCP acceptor and liveness sweep           │
//! │  ├── session.rs  - Per-client read/write pumps               │
//! │  └── simulation.rs - Fixed-period task owning the race       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! The race is owned by a single simulation task. Sessions never touch it
//! directly: they send requests down one command channel and receive
//! immutable snapshots from a broadcast channel.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use codec::{Message, Packet};
pub use config::{Config, RaceConfig, ServerConfig};
pub use crate::core::geo::GpsCoordinate;
pub use crate::core::rng::DeterministicRng;
pub use game::{RaceEngine, RaceSnapshot, SourceId};
pub use network::{RaceServer, ServerHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
