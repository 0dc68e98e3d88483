//! Typed messages and the encode/decode entry points.

use serde::{Deserialize, Serialize};

use super::boat::{BoatLocation, BoatState};
use super::bytes::{ByteReader, ByteWriter};
use super::control::{BoatAction, Heartbeat, JoinAcceptance, RequestToJoin};
use super::error::{DecodeError, EncodeError};
use super::event::{MarkRounding, YachtEvent};
use super::frame::{decode_frame, encode_frame};
use super::race::{RaceStartStatus, RaceStatus, XmlMessage};
use super::types::MessageType;
use super::wind::{AverageWind, CourseWinds};

/// A message body with a fixed type code and layout.
pub trait WireBody: Sized {
    /// Type code written into the frame header.
    const TYPE: MessageType;

    /// Append the body to `w`.
    fn encode_body(&self, w: &mut ByteWriter) -> Result<(), EncodeError>;

    /// Read the body from `r`. The caller checks for trailing bytes.
    fn decode_body(r: &mut ByteReader<'_>) -> Result<Self, DecodeError>;
}

/// Every message the server can send or receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Liveness ping.
    Heartbeat(Heartbeat),
    /// Race phase, wind and roster.
    RaceStatus(RaceStatus),
    /// Course document.
    Xml(XmlMessage),
    /// Start-time notification.
    RaceStartStatus(RaceStartStatus),
    /// Incident report.
    YachtEvent(YachtEvent),
    /// Position report.
    BoatLocation(BoatLocation),
    /// Mark rounding.
    MarkRounding(MarkRounding),
    /// Course reference point winds.
    CourseWinds(CourseWinds),
    /// Rolling wind averages.
    AverageWind(AverageWind),
    /// Client control input.
    BoatAction(BoatAction),
    /// Join request.
    RequestToJoin(RequestToJoin),
    /// Join answer.
    JoinAcceptance(JoinAcceptance),
    /// Boat health.
    BoatState(BoatState),
    /// Structurally valid frame with a type code outside the closed set.
    Unrecognized {
        /// Raw type code.
        code: u8,
        /// Undecoded body.
        body: Vec<u8>,
    },
}

impl Message {
    /// Type code for the frame header.
    pub fn type_code(&self) -> u8 {
        match self {
            Message::Heartbeat(_) => MessageType::Heartbeat.as_u8(),
            Message::RaceStatus(_) => MessageType::RaceStatus.as_u8(),
            Message::Xml(_) => MessageType::XmlMessage.as_u8(),
            Message::RaceStartStatus(_) => MessageType::RaceStartStatus.as_u8(),
            Message::YachtEvent(_) => MessageType::YachtEvent.as_u8(),
            Message::BoatLocation(_) => MessageType::BoatLocation.as_u8(),
            Message::MarkRounding(_) => MessageType::MarkRounding.as_u8(),
            Message::CourseWinds(_) => MessageType::CourseWinds.as_u8(),
            Message::AverageWind(_) => MessageType::AverageWind.as_u8(),
            Message::BoatAction(_) => MessageType::BoatAction.as_u8(),
            Message::RequestToJoin(_) => MessageType::RequestToJoin.as_u8(),
            Message::JoinAcceptance(_) => MessageType::JoinAcceptance.as_u8(),
            Message::BoatState(_) => MessageType::BoatState.as_u8(),
            Message::Unrecognized { code, .. } => *code,
        }
    }

    /// Closed-set type, `None` for unrecognized messages.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_u8(self.type_code())
    }

    /// Serialize just the body.
    pub fn encode_body(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = ByteWriter::with_capacity(64);
        match self {
            Message::Heartbeat(m) => m.encode_body(&mut w)?,
            Message::RaceStatus(m) => m.encode_body(&mut w)?,
            Message::Xml(m) => m.encode_body(&mut w)?,
            Message::RaceStartStatus(m) => m.encode_body(&mut w)?,
            Message::YachtEvent(m) => m.encode_body(&mut w)?,
            Message::BoatLocation(m) => m.encode_body(&mut w)?,
            Message::MarkRounding(m) => m.encode_body(&mut w)?,
            Message::CourseWinds(m) => m.encode_body(&mut w)?,
            Message::AverageWind(m) => m.encode_body(&mut w)?,
            Message::BoatAction(m) => m.encode_body(&mut w)?,
            Message::RequestToJoin(m) => m.encode_body(&mut w)?,
            Message::JoinAcceptance(m) => m.encode_body(&mut w)?,
            Message::BoatState(m) => m.encode_body(&mut w)?,
            Message::Unrecognized { body, .. } => w.put_slice(body),
        }
        Ok(w.into_inner())
    }

    /// Parse a body for type `code`. Unknown codes become `Unrecognized`.
    pub fn decode_body(code: u8, body: &[u8]) -> Result<Message, DecodeError> {
        let Some(kind) = MessageType::from_u8(code) else {
            return Ok(Message::Unrecognized {
                code,
                body: body.to_vec(),
            });
        };

        let mut r = ByteReader::new(body);
        let message = match kind {
            MessageType::Heartbeat => Message::Heartbeat(WireBody::decode_body(&mut r)?),
            MessageType::RaceStatus => Message::RaceStatus(WireBody::decode_body(&mut r)?),
            MessageType::XmlMessage => Message::Xml(WireBody::decode_body(&mut r)?),
            MessageType::RaceStartStatus => Message::RaceStartStatus(WireBody::decode_body(&mut r)?),
            MessageType::YachtEvent => Message::YachtEvent(WireBody::decode_body(&mut r)?),
            MessageType::BoatLocation => Message::BoatLocation(WireBody::decode_body(&mut r)?),
            MessageType::MarkRounding => Message::MarkRounding(WireBody::decode_body(&mut r)?),
            MessageType::CourseWinds => Message::CourseWinds(WireBody::decode_body(&mut r)?),
            MessageType::AverageWind => Message::AverageWind(WireBody::decode_body(&mut r)?),
            MessageType::BoatAction => Message::BoatAction(WireBody::decode_body(&mut r)?),
            MessageType::RequestToJoin => Message::RequestToJoin(WireBody::decode_body(&mut r)?),
            MessageType::JoinAcceptance => Message::JoinAcceptance(WireBody::decode_body(&mut r)?),
            MessageType::BoatState => Message::BoatState(WireBody::decode_body(&mut r)?),
        };
        r.finish()?;
        Ok(message)
    }
}

/// A message together with its frame header fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Sender timestamp, epoch ms.
    pub timestamp_ms: u64,
    /// Header source id.
    pub source_id: u32,
    /// Payload.
    pub message: Message,
}

impl Packet {
    /// Create a packet.
    pub fn new(timestamp_ms: u64, source_id: u32, message: Message) -> Self {
        Self {
            timestamp_ms,
            source_id,
            message,
        }
    }

    /// Serialize into a complete frame.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let body = self.message.encode_body()?;
        encode_frame(self.message.type_code(), self.timestamp_ms, self.source_id, &body)
    }

    /// Check a complete frame and parse its body.
    pub fn decode(bytes: &[u8]) -> Result<Packet, DecodeError> {
        let raw = decode_frame(bytes)?;
        let message = Message::decode_body(raw.type_code, &raw.body)?;
        Ok(Packet {
            timestamp_ms: raw.timestamp_ms,
            source_id: raw.source_id,
            message,
        })
    }
}

/// Encode `message` with a header timestamp and source id.
pub fn encode(message: &Message, timestamp_ms: u64, source_id: u32) -> Result<Vec<u8>, EncodeError> {
    let body = message.encode_body()?;
    encode_frame(message.type_code(), timestamp_ms, source_id, &body)
}

/// Decode a complete frame into its message, discarding header fields.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    Packet::decode(bytes).map(|p| p.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::boat::BOAT_LOCATION_VERSION;
    use crate::codec::frame::{CRC_LEN, HEADER_LEN};
    use crate::codec::race::BoatStatusRecord;
    use crate::codec::types::*;
    use crate::codec::wind::{CourseWind, WindAverage};
    use crate::codec::FrameError;

    fn location() -> BoatLocation {
        BoatLocation {
            time_ms: 1_505_000_000_000,
            source_id: 101,
            sequence: 7,
            device: DeviceType::RacingYacht,
            latitude: -439_636_893,
            longitude: 2_084_851_277,
            altitude: 0,
            heading: 16_384,
            pitch: 0,
            roll: -12,
            boat_speed: 5_144,
            course_over_ground: 16_384,
            speed_over_ground: 5_144,
            apparent_wind_speed: 4_000,
            apparent_wind_angle: -8_000,
            true_wind_speed: 6_000,
            true_wind_direction: 0,
            true_wind_angle: -16_384,
            current_drift: 0,
            current_set: 0,
            rudder_angle: 300,
        }
    }

    fn race_status(boats: usize) -> RaceStatus {
        RaceStatus {
            current_time_ms: 1_505_000_000_000,
            race_id: 9_001,
            status: RaceStatusKind::Started,
            expected_start_ms: 1_504_999_990_000,
            wind_direction: 8_192,
            wind_speed: 6_173,
            race_type: RaceType::FleetRace,
            boats: (0..boats)
                .map(|i| BoatStatusRecord {
                    source_id: 100 + i as u32,
                    status: BoatStatus::Racing,
                    leg: 2,
                    penalties_awarded: 0,
                    penalties_served: 0,
                    estimated_next_mark_ms: 1_505_000_060_000,
                    estimated_finish_ms: 1_505_000_600_000,
                })
                .collect(),
        }
    }

    fn every_message() -> Vec<Message> {
        vec![
            Message::Heartbeat(Heartbeat { sequence: 42 }),
            Message::RaceStatus(race_status(3)),
            Message::Xml(XmlMessage {
                ack: 1,
                timestamp_ms: 5,
                subtype: XmlSubtype::Race,
                sequence: 2,
                text: "<Race><RaceID>9001</RaceID></Race>".into(),
            }),
            Message::RaceStartStatus(RaceStartStatus {
                timestamp_ms: 10,
                ack: 3,
                start_time_ms: 40_000,
                race_id: 9_001,
                kind: RaceStartKind::SetRaceStart,
            }),
            Message::YachtEvent(YachtEvent {
                time_ms: 11,
                ack: 4,
                race_id: 9_001,
                source_id: 101,
                incident_id: 0,
                event: YachtEventKind::Collision,
            }),
            Message::BoatLocation(location()),
            Message::MarkRounding(MarkRounding {
                time_ms: 12,
                ack: 5,
                race_id: 9_001,
                source_id: 102,
                boat_status: RoundingBoatStatus::Racing,
                side: RoundingSide::Starboard,
                mark_type: RoundingMarkType::Gate,
                mark_id: 3,
            }),
            Message::CourseWinds(CourseWinds {
                selected_wind_id: 1,
                winds: vec![CourseWind {
                    wind_id: 1,
                    time_ms: 13,
                    race_id: 9_001,
                    direction: 100,
                    speed: 6_000,
                    best_upwind_angle: 7_000,
                    best_downwind_angle: 27_000,
                    flags: 0,
                }],
            }),
            Message::AverageWind(AverageWind {
                time_ms: 14,
                windows: [
                    WindAverage { period: 0, speed: 6_000 },
                    WindAverage { period: 150, speed: 6_100 },
                    WindAverage { period: 300, speed: 6_050 },
                    WindAverage { period: 600, speed: 5_990 },
                ],
            }),
            Message::BoatAction(BoatAction { action: BoatActionKind::TackGybe }),
            Message::RequestToJoin(RequestToJoin { role: JoinRole::Participant }),
            Message::JoinAcceptance(JoinAcceptance {
                source_id: 42,
                kind: JoinAcceptanceKind::Participant,
            }),
            Message::BoatState(BoatState { source_id: 42, health: 85 }),
        ]
    }

    #[test]
    fn test_every_type_round_trips() {
        for message in every_message() {
            let packet = Packet::new(1_505_000_000_000, 0, message.clone());
            let bytes = packet.encode().unwrap();
            assert_eq!(Packet::decode(&bytes).unwrap(), packet, "{:?}", message.message_type());
        }
    }

    #[test]
    fn test_fixed_body_sizes() {
        let size = |m: Message| m.encode_body().unwrap().len();
        assert_eq!(size(Message::BoatLocation(location())), 56);
        assert_eq!(size(Message::RaceStatus(race_status(0))), 24);
        assert_eq!(size(Message::RaceStatus(race_status(4))), 24 + 4 * 20);
        assert_eq!(size(Message::BoatState(BoatState { source_id: 1, health: 1 })), 5);
        for message in every_message() {
            match &message {
                Message::MarkRounding(_) => assert_eq!(size(message), 21),
                Message::YachtEvent(_) => assert_eq!(size(message), 22),
                Message::AverageWind(_) => assert_eq!(size(message), 23),
                Message::RaceStartStatus(_) => assert_eq!(size(message), 20),
                Message::CourseWinds(_) => assert_eq!(size(message), 3 + 20),
                _ => {}
            }
        }
    }

    #[test]
    fn test_location_body_starts_with_version() {
        let body = Message::BoatLocation(location()).encode_body().unwrap();
        assert_eq!(body[0], BOAT_LOCATION_VERSION);
        assert_eq!(&body[7..11], &101u32.to_le_bytes());
    }

    #[test]
    fn test_unknown_type_is_sentinel() {
        let frame = encode_frame(250, 1, 2, &[9, 9]).unwrap();
        assert_eq!(
            decode(&frame).unwrap(),
            Message::Unrecognized { code: 250, body: vec![9, 9] }
        );
    }

    #[test]
    fn test_invalid_enum_rejects_frame() {
        let frame = encode_frame(MessageType::BoatAction.as_u8(), 0, 0, &[0x42]).unwrap();
        assert_eq!(
            decode(&frame),
            Err(DecodeError::InvalidField {
                message: MessageType::BoatAction,
                field: "action",
                value: 0x42,
            })
        );

        let frame = encode_frame(MessageType::RequestToJoin.as_u8(), 0, 0, &(-1i32).to_le_bytes()).unwrap();
        assert!(matches!(decode(&frame), Err(DecodeError::InvalidField { field: "role", .. })));
    }

    #[test]
    fn test_short_and_long_bodies_rejected() {
        let frame = encode_frame(MessageType::Heartbeat.as_u8(), 0, 0, &[1, 2]).unwrap();
        assert!(matches!(decode(&frame), Err(DecodeError::BodyTooShort { .. })));

        let frame = encode_frame(MessageType::Heartbeat.as_u8(), 0, 0, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(decode(&frame), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn test_frame_errors_surface_distinctly() {
        let mut bytes = encode(&Message::Heartbeat(Heartbeat { sequence: 1 }), 0, 0).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let err = decode(&bytes).unwrap_err();
        assert!(err.is_frame_error());
        assert!(matches!(err, DecodeError::Frame(FrameError::CrcMismatch { .. })));
        assert_eq!(bytes.len(), HEADER_LEN + 4 + CRC_LEN);
    }

    #[test]
    fn test_too_many_boats() {
        let status = race_status(256);
        assert!(matches!(
            Message::RaceStatus(status).encode_body(),
            Err(EncodeError::TooMany { what: "boats", count: 256 })
        ));
    }
}
