//! Client control and session bodies: heartbeat, join handshake, boat actions.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::error::{DecodeError, EncodeError};
use super::message::WireBody;
use super::types::{BoatActionKind, JoinAcceptanceKind, JoinRole, MessageType};

/// Liveness ping carrying a per-sender sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Sender's heartbeat counter.
    pub sequence: u32,
}

impl WireBody for Heartbeat {
    const TYPE: MessageType = MessageType::Heartbeat;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u32(self.sequence);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Heartbeat { sequence: r.u32()? })
    }
}

/// One control input from a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatAction {
    /// The input.
    pub action: BoatActionKind,
}

impl WireBody for BoatAction {
    const TYPE: MessageType = MessageType::BoatAction;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(self.action.as_u8());
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let raw = r.u8()?;
        let action = BoatActionKind::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "action", raw))?;
        Ok(BoatAction { action })
    }
}

/// A client's request to join the race in some role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToJoin {
    /// Requested role.
    pub role: JoinRole,
}

impl WireBody for RequestToJoin {
    const TYPE: MessageType = MessageType::RequestToJoin;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        // The role travels as a four-byte integer.
        w.put_i32(self.role.as_u8() as i32);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let raw = r.i32()?;
        let role = u8::try_from(raw)
            .ok()
            .and_then(JoinRole::from_u8)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "role", raw))?;
        Ok(RequestToJoin { role })
    }
}

/// The server's answer to a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinAcceptance {
    /// Boat assigned to the client, zero when none.
    pub source_id: u32,
    /// Outcome.
    pub kind: JoinAcceptanceKind,
}

impl WireBody for JoinAcceptance {
    const TYPE: MessageType = MessageType::JoinAcceptance;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u32(self.source_id);
        w.put_u8(self.kind.as_u8());
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let source_id = r.u32()?;
        let raw = r.u8()?;
        let kind = JoinAcceptanceKind::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "acceptance type", raw))?;
        Ok(JoinAcceptance { source_id, kind })
    }
}
