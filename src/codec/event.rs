//! Race incident bodies: mark roundings and yacht events.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::error::{DecodeError, EncodeError};
use super::message::WireBody;
use super::types::{
    MessageType, RoundingBoatStatus, RoundingMarkType, RoundingSide, YachtEventKind,
};

/// Layout version written into mark rounding bodies.
pub const MARK_ROUNDING_VERSION: u8 = 1;
/// Layout version written into yacht event bodies.
pub const YACHT_EVENT_VERSION: u8 = 2;

/// A boat rounded a mark or passed through a gate. 21 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRounding {
    /// Time of rounding, epoch ms.
    pub time_ms: u64,
    /// Acknowledgement number.
    pub ack: u16,
    /// Race identifier.
    pub race_id: u32,
    /// Boat id.
    pub source_id: u32,
    /// Status of the boat when rounding.
    pub boat_status: RoundingBoatStatus,
    /// Side the mark was left on.
    pub side: RoundingSide,
    /// Single mark or gate.
    pub mark_type: RoundingMarkType,
    /// Compound mark id.
    pub mark_id: u8,
}

impl WireBody for MarkRounding {
    const TYPE: MessageType = MessageType::MarkRounding;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(MARK_ROUNDING_VERSION);
        w.put_u48(self.time_ms);
        w.put_u16(self.ack);
        w.put_u32(self.race_id);
        w.put_u32(self.source_id);
        w.put_u8(self.boat_status.as_u8());
        w.put_u8(self.side.as_u8());
        w.put_u8(self.mark_type.as_u8());
        w.put_u8(self.mark_id);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let time_ms = r.u48()?;
        let ack = r.u16()?;
        let race_id = r.u32()?;
        let source_id = r.u32()?;

        let raw = r.u8()?;
        let boat_status = RoundingBoatStatus::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "boat status", raw))?;
        let raw = r.u8()?;
        let side = RoundingSide::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "rounding side", raw))?;
        let raw = r.u8()?;
        let mark_type = RoundingMarkType::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "mark type", raw))?;

        Ok(MarkRounding {
            time_ms,
            ack,
            race_id,
            source_id,
            boat_status,
            side,
            mark_type,
            mark_id: r.u8()?,
        })
    }
}

/// Incident report. 22 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YachtEvent {
    /// Time of the incident, epoch ms.
    pub time_ms: u64,
    /// Acknowledgement number.
    pub ack: u16,
    /// Race identifier.
    pub race_id: u32,
    /// Boat involved.
    pub source_id: u32,
    /// Incident identifier.
    pub incident_id: u32,
    /// What happened.
    pub event: YachtEventKind,
}

impl WireBody for YachtEvent {
    const TYPE: MessageType = MessageType::YachtEvent;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(YACHT_EVENT_VERSION);
        w.put_u48(self.time_ms);
        w.put_u16(self.ack);
        w.put_u32(self.race_id);
        w.put_u32(self.source_id);
        w.put_u32(self.incident_id);
        w.put_u8(self.event.as_u8());
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let time_ms = r.u48()?;
        let ack = r.u16()?;
        let race_id = r.u32()?;
        let source_id = r.u32()?;
        let incident_id = r.u32()?;
        let raw = r.u8()?;
        let event = YachtEventKind::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "event id", raw))?;
        Ok(YachtEvent {
            time_ms,
            ack,
            race_id,
            source_id,
            incident_id,
            event,
        })
    }
}
