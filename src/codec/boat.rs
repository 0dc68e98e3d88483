//! Per-boat telemetry bodies.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::error::{DecodeError, EncodeError};
use super::message::WireBody;
use super::types::{DeviceType, MessageType};

/// Layout version written into location bodies.
pub const BOAT_LOCATION_VERSION: u8 = 1;

/// Position and motion report for a boat or a mark. 56 bytes on the wire.
///
/// Every field holds its packed wire value: coordinates are 32-bit fixed
/// point, bearings are unsigned fractions of a turn, signed angles are
/// fractions of a half turn and speeds are mm/s. Conversions live in
/// [`crate::core::units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatLocation {
    /// Time of the fix, epoch ms.
    pub time_ms: u64,
    /// Boat or mark id.
    pub source_id: u32,
    /// Per-source report counter.
    pub sequence: u32,
    /// What kind of device produced the report.
    pub device: DeviceType,
    /// Packed latitude.
    pub latitude: i32,
    /// Packed longitude.
    pub longitude: i32,
    /// Altitude, millimetres.
    pub altitude: i32,
    /// Packed heading.
    pub heading: u16,
    /// Packed pitch.
    pub pitch: i16,
    /// Packed roll.
    pub roll: i16,
    /// Speed through water, mm/s.
    pub boat_speed: u16,
    /// Packed course over ground.
    pub course_over_ground: u16,
    /// Speed over ground, mm/s.
    pub speed_over_ground: u16,
    /// Apparent wind speed, mm/s.
    pub apparent_wind_speed: u16,
    /// Packed apparent wind angle.
    pub apparent_wind_angle: i16,
    /// True wind speed, mm/s.
    pub true_wind_speed: u16,
    /// Packed true wind direction.
    pub true_wind_direction: u16,
    /// Packed true wind angle.
    pub true_wind_angle: i16,
    /// Current drift, mm/s.
    pub current_drift: u16,
    /// Packed current set.
    pub current_set: u16,
    /// Packed rudder angle.
    pub rudder_angle: i16,
}

impl WireBody for BoatLocation {
    const TYPE: MessageType = MessageType::BoatLocation;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(BOAT_LOCATION_VERSION);
        w.put_u48(self.time_ms);
        w.put_u32(self.source_id);
        w.put_u32(self.sequence);
        w.put_u8(self.device.as_u8());
        w.put_i32(self.latitude);
        w.put_i32(self.longitude);
        w.put_i32(self.altitude);
        w.put_u16(self.heading);
        w.put_i16(self.pitch);
        w.put_i16(self.roll);
        w.put_u16(self.boat_speed);
        w.put_u16(self.course_over_ground);
        w.put_u16(self.speed_over_ground);
        w.put_u16(self.apparent_wind_speed);
        w.put_i16(self.apparent_wind_angle);
        w.put_u16(self.true_wind_speed);
        w.put_u16(self.true_wind_direction);
        w.put_i16(self.true_wind_angle);
        w.put_u16(self.current_drift);
        w.put_u16(self.current_set);
        w.put_i16(self.rudder_angle);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let time_ms = r.u48()?;
        let source_id = r.u32()?;
        let sequence = r.u32()?;
        let raw = r.u8()?;
        let device = DeviceType::from_u8(raw)
            .ok_or_else(|| DecodeError::invalid(Self::TYPE, "device type", raw))?;
        Ok(BoatLocation {
            time_ms,
            source_id,
            sequence,
            device,
            latitude: r.i32()?,
            longitude: r.i32()?,
            altitude: r.i32()?,
            heading: r.u16()?,
            pitch: r.i16()?,
            roll: r.i16()?,
            boat_speed: r.u16()?,
            course_over_ground: r.u16()?,
            speed_over_ground: r.u16()?,
            apparent_wind_speed: r.u16()?,
            apparent_wind_angle: r.i16()?,
            true_wind_speed: r.u16()?,
            true_wind_direction: r.u16()?,
            true_wind_angle: r.i16()?,
            current_drift: r.u16()?,
            current_set: r.u16()?,
            rudder_angle: r.i16()?,
        })
    }
}

/// Boat health report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatState {
    /// Boat id.
    pub source_id: u32,
    /// Health, 0 to 100.
    pub health: u8,
}

impl WireBody for BoatState {
    const TYPE: MessageType = MessageType::BoatState;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u32(self.source_id);
        w.put_u8(self.health);
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let source_id = r.u32()?;
        let health = r.u8()?;
        if health > 100 {
            return Err(DecodeError::invalid(Self::TYPE, "health", health));
        }
        Ok(BoatState { source_id, health })
    }
}
