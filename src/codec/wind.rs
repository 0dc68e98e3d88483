//! Wind bodies.

use serde::{Deserialize, Serialize};

use super::bytes::{ByteReader, ByteWriter};
use super::error::{DecodeError, EncodeError};
use super::message::WireBody;
use super::types::MessageType;

/// Layout version written into average wind bodies.
pub const AVERAGE_WIND_VERSION: u8 = 1;
/// Layout version written into course wind bodies.
pub const COURSE_WINDS_VERSION: u8 = 1;

/// One averaging window: period in tenths of a second, speed in mm/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindAverage {
    /// Averaging period, tenths of a second.
    pub period: u16,
    /// Mean speed over the period, mm/s.
    pub speed: u16,
}

/// Raw speed followed by three rolling averages. 23 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AverageWind {
    /// Time of the sample, epoch ms.
    pub time_ms: u64,
    /// Raw sample then the three averaging windows.
    pub windows: [WindAverage; 4],
}

impl WireBody for AverageWind {
    const TYPE: MessageType = MessageType::AverageWind;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(AVERAGE_WIND_VERSION);
        w.put_u48(self.time_ms);
        for window in &self.windows {
            w.put_u16(window.period);
            w.put_u16(window.speed);
        }
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let time_ms = r.u48()?;
        let mut windows = [WindAverage::default(); 4];
        for window in windows.iter_mut() {
            window.period = r.u16()?;
            window.speed = r.u16()?;
        }
        Ok(AverageWind { time_ms, windows })
    }
}

/// Wind at one reference point. 20 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseWind {
    /// Reference point id.
    pub wind_id: u8,
    /// Time of the reading, epoch ms.
    pub time_ms: u64,
    /// Race identifier.
    pub race_id: u32,
    /// Packed wind direction.
    pub direction: u16,
    /// Wind speed, mm/s.
    pub speed: u16,
    /// Packed best upwind angle.
    pub best_upwind_angle: u16,
    /// Packed best downwind angle.
    pub best_downwind_angle: u16,
    /// Source flags.
    pub flags: u8,
}

/// Wind readings from every course reference point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseWinds {
    /// Reference point the race is using.
    pub selected_wind_id: u8,
    /// One entry per reference point.
    pub winds: Vec<CourseWind>,
}

impl WireBody for CourseWinds {
    const TYPE: MessageType = MessageType::CourseWinds;

    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError> {
        w.put_u8(COURSE_WINDS_VERSION);
        w.put_u8(self.selected_wind_id);
        w.put_count(self.winds.len(), "course winds")?;
        for wind in &self.winds {
            w.put_u8(wind.wind_id);
            w.put_u48(wind.time_ms);
            w.put_u32(wind.race_id);
            w.put_u16(wind.direction);
            w.put_u16(wind.speed);
            w.put_u16(wind.best_upwind_angle);
            w.put_u16(wind.best_downwind_angle);
            w.put_u8(wind.flags);
        }
        Ok(())
    }

    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let _version = r.u8()?;
        let selected_wind_id = r.u8()?;
        let count = r.u8()? as usize;
        let mut winds = Vec::with_capacity(count);
        for _ in 0..count {
            winds.push(CourseWind {
                wind_id: r.u8()?,
                time_ms: r.u48()?,
                race_id: r.u32()?,
                direction: r.u16()?,
                speed: r.u16()?,
                best_upwind_angle: r.u16()?,
                best_downwind_angle: r.u16()?,
                flags: r.u8()?,
            });
        }
        Ok(CourseWinds {
            selected_wind_id,
            winds,
        })
    }
}
