//! Join handshake state machine.
//!
//! ```text
//! Unknown ──RequestToJoin──► RequestReceived ──accepted──► Connected
//!    │                             │        └──refused───► Declined
//!    └───────── stream closed ─────┴─────────────────────► TimedOut
//! ```

use crate::codec::{JoinAcceptance, JoinRole};
use crate::game::{Admission, SourceId};

/// Where a session is in the join handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Nothing received yet.
    Unknown,
    /// A join request is awaiting a decision.
    RequestReceived,
    /// Joined; game messages are routed.
    Connected,
    /// Join refused.
    Declined,
    /// The stream closed before the join was answered.
    TimedOut,
}

impl ConnectionState {
    /// No further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Declined | ConnectionState::TimedOut)
    }
}

/// Handshake errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    /// A join request arrived in a state that does not take one.
    #[error("join request not expected in state {0:?}")]
    UnexpectedRequest(ConnectionState),
}

/// Handshake progress for one session.
#[derive(Debug)]
pub struct Handshake {
    state: ConnectionState,
    role: Option<JoinRole>,
    source_id: Option<SourceId>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    /// Fresh handshake.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Unknown,
            role: None,
            source_id: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Role requested, once a request has arrived.
    pub fn role(&self) -> Option<JoinRole> {
        self.role
    }

    /// Boat bound to the session.
    pub fn source_id(&self) -> Option<SourceId> {
        self.source_id
    }

    /// A join request arrived.
    pub fn request(&mut self, role: JoinRole) -> Result<(), HandshakeError> {
        if self.state != ConnectionState::Unknown {
            return Err(HandshakeError::UnexpectedRequest(self.state));
        }
        self.state = ConnectionState::RequestReceived;
        self.role = Some(role);
        Ok(())
    }

    /// The race decided; returns the answer for the client.
    pub fn complete(&mut self, admission: Admission) -> JoinAcceptance {
        if admission.kind.is_success() {
            self.state = ConnectionState::Connected;
            self.source_id = admission.boat();
        } else {
            self.state = ConnectionState::Declined;
        }
        JoinAcceptance {
            source_id: admission.source_id,
            kind: admission.kind,
        }
    }

    /// The stream closed. Only an unanswered handshake times out.
    pub fn close(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Unknown | ConnectionState::RequestReceived
        ) {
            self.state = ConnectionState::TimedOut;
        }
    }
}
