//! Race-level bodies: status roster, start notifications, course documents.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::error::{DecodeError, EncodeError};
use super::message::WireBody;
use super::types::{BoatStatus, MessageType, RaceStartKind, RaceStatusKind, RaceType, XmlSubtype};

/// Layout version written into race status bodies.
pub const RACE_STATUS_VERSION: u8 = 2;
/// Layout version written into XML bodies.
pub const XML_MESSAGE_VERSION: u8 = 1;
/// Layout version written into race start bodies.
pub const RACE_START_VERSION: u8 = 1;

/// Per-boat entry in a race status roster. 20 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatStatusRecord {
    /// Boat id.
    pub source_id: u32,
    /// Race status of the boat.
    pub status: BoatStatus,
    /// Leg the boat is sailing, zero before the start.
    pub leg: u8,
    /// Penalties awarded.
    pub penalties_awarded: u8,
    /// Penalties served.
    pub penalties_served: u8,
    /// Estimated arrival at the next mark, epoch ms.
    pub estimated_next_mark_ms: u64,
    /// Estimated finish time, epoch ms.
    pub estimated_finish_ms: u64,
}

impl BoatStatusRecord {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u32(self.source_id);
        w.put_u8(self.status.as_u8());
        w.put_u8(self.leg);
        w.put_u8(self.penalties_awarded);
        w.put_u8(self.penalties_served);
        w.put_u48(self.estimated_next_mark_ms);
        w.put_u48(self.estimated_finish_ms);
    }

    fn decode(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let source_id = r.u32()?;
        let raw = r.u8()?;
        let status = BoatStatus::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(MessageType::RaceStatus, "boat status", raw))?;
        Ok(BoatStatusRecord {
            source_id,
            status,
            leg: r.u8()?,
            penalties_awarded: r.u8()?,
            penalties_served: r.u8()?,
            estimated_next_mark_ms: r.u48()?,
            estimated_finish_ms: r.u48()?,
        })
    }
}

/// Race phase, wind and per-boat roster.
///
/// Wind direction is a packed heading and wind speed is in mm/s; see
/// [`crate::core::units`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceStatus {
    /// Current race time, epoch ms.
    pub current_time_ms: u64,
    /// Race identifier.
    pub race_id: u32,
    /// Race phase.
    pub status: RaceStatusKind,
    /// Scheduled start, epoch ms.
    pub expected_start_ms: u64,
    /// Packed wind direction.
    pub wind_direction: u16,
    /// Wind speed, mm/s.
    pub wind_speed: u16,
    /// Race format.
    pub race_type: RaceType,
    /// One entry per boat.
    pub boats: Vec<BoatStatusRecord>,
}

impl RaceStatus {
    /// Roster entry for `source_id`, if present.
    pub fn boat(&self, source_id: u32) -> Option<&BoatStatusRecord> {
        self.boats.iter().find(|b| b.source_id == source_id)
    }
}

impl WireBody for RaceStatus {
    const TYPE: MessageType = MessageType::RaceStatus;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(RACE_STATUS_VERSION);
        w.put_u48(self.current_time_ms);
        w.put_u32(self.race_id);
        w.put_u8(self.status.as_u8());
        w.put_u48(self.expected_start_ms);
        w.put_u16(self.wind_direction);
        w.put_u16(self.wind_speed);
        w.put_count(self.boats.len(), "boats")?;
        w.put_u8(self.race_type.as_u8());
        for boat in &self.boats {
            boat.encode(w);
        }
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let current_time_ms = r.u48()?;
        let race_id = r.u32()?;
        let raw_status = r.u8()?;
        let status = RaceStatusKind::from_u8(raw_status)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "race status", raw_status))?;
        let expected_start_ms = r.u48()?;
        let wind_direction = r.u16()?;
        let wind_speed = r.u16()?;
        let count = r.u8()? as usize;
        let raw_type = r.u8()?;
        let race_type = RaceType::from_u8(raw_type)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "race type", raw_type))?;

        let mut boats = Vec::with_capacity(count);
        for _ in 0..count {
            boats.push(BoatStatusRecord::decode(r)?);
        }

        Ok(RaceStatus {
            current_time_ms,
            race_id,
            status,
            expected_start_ms,
            wind_direction,
            wind_speed,
            race_type,
            boats,
        })
    }
}

/// Start-time notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceStartStatus {
    /// Time of the notification, epoch ms.
    pub timestamp_ms: u64,
    /// Acknowledgement number.
    pub ack: u16,
    /// Start time, epoch ms.
    pub start_time_ms: u64,
    /// Race identifier.
    pub race_id: u32,
    /// What happened.
    pub kind: RaceStartKind,
}

impl WireBody for RaceStartStatus {
    const TYPE: MessageType = MessageType::RaceStartStatus;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(RACE_START_VERSION);
        w.put_u48(self.timestamp_ms);
        w.put_u16(self.ack);
        w.put_u48(self.start_time_ms);
        w.put_u32(self.race_id);
        w.put_u8(self.kind.as_u8());
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let timestamp_ms = r.u48()?;
        let ack = r.u16()?;
        let start_time_ms = r.u48()?;
        let race_id = r.u32()?;
        let raw = r.u8()?;
        let kind = RaceStartKind::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "notification type", raw))?;
        Ok(RaceStartStatus {
            timestamp_ms,
            ack,
            start_time_ms,
            race_id,
            kind,
        })
    }
}

/// Course document relayed verbatim from the course data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlMessage {
    /// Acknowledgement number.
    pub ack: u16,
    /// Time the document was produced, epoch ms.
    pub timestamp_ms: u64,
    /// Which document this is.
    pub subtype: XmlSubtype,
    /// Revision of this document.
    pub sequence: u16,
    /// Document text.
    pub text: String,
}

impl WireBody for XmlMessage {
    const TYPE: MessageType = MessageType::XmlMessage;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        let text = self.text.as_bytes();
        let len = u16::try_from(text.len()).map_err(|_| EncodeError::BodyTooLong(text.len()))?;
        w.put_u8(XML_MESSAGE_VERSION);
        w.put_u16(self.ack);
        w.put_u48(self.timestamp_ms);
        w.put_u8(self.subtype.as_u8());
        w.put_u16(self.sequence);
        w.put_u16(len);
        w.put_slice(text);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let ack = r.u16()?;
        let timestamp_ms = r.u48()?;
        let raw = r.u8()?;
        let subtype = XmlSubtype::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "xml subtype", raw))?;
        let sequence = r.u16()?;
        let len = r.u16()? as usize;
        let text = std::str::from_utf8(r.bytes(len)?)
            .map_err(|_| DecodeError::InvalidText(Self::TYPE))?
            .to_owned();
        Ok(XmlMessage {
            ack,
            timestamp_ms,
            subtype,
            sequence,
            text,
        })
    }
}
