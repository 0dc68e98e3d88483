//! Snapshot to wire message conversion.
//!
//! Every session turns the shared [`RaceSnapshot`] into packets itself, so a
//! slow client only ever delays its own stream.

use crate::codec::{
    BoatLocation, BoatState, BoatStatusRecord, CourseWind, CourseWinds, DeviceType, MarkRounding,
    Message, Packet, RaceStartKind, RaceStartStatus, RaceStatus, RoundingBoatStatus, RoundingMarkType,
    RoundingSide, XmlMessage, YachtEvent, YachtEventKind,
};
use crate::core::units::{knots_to_mmps, pack_gps, pack_heading, pack_signed_angle};
use crate::game::{BoatSnapshot, CourseDocument, MarkSnapshot, RaceEvent, RaceEventData, RaceSnapshot};
use crate::network::context::AckSequencer;

/// Ticks between course wind reports.
pub const COURSE_WIND_TICKS: u32 = 60;

/// Wind id used for the single course wind reported.
const COURSE_WIND_ID: u8 = 1;

/// Source id stamped on messages that describe the race rather than a boat.
pub const SERVER_SOURCE_ID: u32 = 0;

/// Packets describing one snapshot, in send order: race status, locations,
/// boat states, events and, periodically, course winds.
pub fn snapshot_packets(snapshot: &RaceSnapshot) -> Vec<Packet> {
    let time = snapshot.time_ms;
    let mut packets = Vec::with_capacity(2 + snapshot.boats.len() * 2 + snapshot.marks.len());

    packets.push(Packet::new(
        time,
        SERVER_SOURCE_ID,
        Message::RaceStatus(race_status(snapshot)),
    ));

    for boat in &snapshot.boats {
        packets.push(Packet::new(
            time,
            boat.source_id,
            Message::BoatLocation(boat_location(snapshot, boat)),
        ));
    }
    for mark in &snapshot.marks {
        packets.push(Packet::new(
            time,
            mark.source_id,
            Message::BoatLocation(mark_location(snapshot, mark)),
        ));
    }
    for boat in &snapshot.boats {
        packets.push(Packet::new(
            time,
            boat.source_id,
            Message::BoatState(BoatState {
                source_id: boat.source_id,
                health: boat.health.round().clamp(0.0, 100.0) as u8,
            }),
        ));
    }

    for event in &snapshot.events {
        if let Some(message) = event_message(snapshot, event) {
            packets.push(Packet::new(time, SERVER_SOURCE_ID, message));
        }
    }

    if snapshot.tick % COURSE_WIND_TICKS == 0 {
        packets.push(Packet::new(
            time,
            SERVER_SOURCE_ID,
            Message::CourseWinds(course_winds(snapshot)),
        ));
    }

    packets
}

/// Give every reported event in a snapshot its acknowledgement number.
///
/// Runs once per snapshot before it is shared, so the number is the same in
/// every client's copy of the message.
pub fn stamp_event_acks(snapshot: &mut RaceSnapshot, acks: &AckSequencer) {
    for event in snapshot.events.iter_mut().filter(|e| e.is_reported()) {
        event.ack = acks.next();
    }
}

/// Packets sent right after a successful join: the course documents and
/// the scheduled start.
pub fn join_packets(
    documents: &[CourseDocument],
    race_id: u32,
    start_time_ms: u64,
    now_ms: u64,
    acks: &AckSequencer,
) -> Vec<Packet> {
    let mut packets: Vec<Packet> = documents
        .iter()
        .map(|doc| {
            Packet::new(
                now_ms,
                SERVER_SOURCE_ID,
                Message::Xml(XmlMessage {
                    ack: acks.next(),
                    timestamp_ms: now_ms,
                    subtype: doc.subtype,
                    sequence: doc.sequence,
                    text: doc.text.clone(),
                }),
            )
        })
        .collect();

    packets.push(Packet::new(
        now_ms,
        SERVER_SOURCE_ID,
        Message::RaceStartStatus(RaceStartStatus {
            timestamp_ms: now_ms,
            ack: acks.next(),
            start_time_ms,
            race_id,
            kind: RaceStartKind::SetRaceStart,
        }),
    ));
    packets
}

fn race_status(snapshot: &RaceSnapshot) -> RaceStatus {
    RaceStatus {
        current_time_ms: snapshot.time_ms,
        race_id: snapshot.race_id,
        status: snapshot.status,
        expected_start_ms: snapshot.start_time_ms,
        wind_direction: pack_heading(snapshot.wind.direction),
        wind_speed: knots_to_mmps(snapshot.wind.speed),
        race_type: snapshot.race_type,
        boats: snapshot
            .boats
            .iter()
            .map(|boat| BoatStatusRecord {
                source_id: boat.source_id,
                status: boat.status,
                leg: boat.leg.min(u8::MAX as usize) as u8,
                penalties_awarded: 0,
                penalties_served: 0,
                estimated_next_mark_ms: boat.estimated_next_mark_ms,
                estimated_finish_ms: 0,
            })
            .collect(),
    }
}

fn boat_location(snapshot: &RaceSnapshot, boat: &BoatSnapshot) -> BoatLocation {
    let (apparent_speed, apparent_angle) = snapshot.apparent_wind(boat);
    let mut true_angle = snapshot.wind.direction - boat.heading;
    if true_angle > 180.0 {
        true_angle -= 360.0;
    } else if true_angle < -180.0 {
        true_angle += 360.0;
    }

    BoatLocation {
        time_ms: snapshot.time_ms,
        source_id: boat.source_id,
        sequence: snapshot.tick,
        device: DeviceType::RacingYacht,
        latitude: pack_gps(boat.position.latitude),
        longitude: pack_gps(boat.position.longitude),
        altitude: 0,
        heading: pack_heading(boat.heading),
        pitch: 0,
        roll: 0,
        boat_speed: knots_to_mmps(boat.speed),
        course_over_ground: pack_heading(boat.heading),
        speed_over_ground: knots_to_mmps(boat.speed),
        apparent_wind_speed: knots_to_mmps(apparent_speed),
        apparent_wind_angle: pack_signed_angle(apparent_angle),
        true_wind_speed: knots_to_mmps(snapshot.wind.speed),
        true_wind_direction: pack_heading(snapshot.wind.direction),
        true_wind_angle: pack_signed_angle(true_angle),
        current_drift: 0,
        current_set: 0,
        rudder_angle: 0,
    }
}

fn mark_location(snapshot: &RaceSnapshot, mark: &MarkSnapshot) -> BoatLocation {
    BoatLocation {
        time_ms: snapshot.time_ms,
        source_id: mark.source_id,
        sequence: snapshot.tick,
        device: DeviceType::Mark,
        latitude: pack_gps(mark.position.latitude),
        longitude: pack_gps(mark.position.longitude),
        altitude: 0,
        heading: 0,
        pitch: 0,
        roll: 0,
        boat_speed: 0,
        course_over_ground: 0,
        speed_over_ground: 0,
        apparent_wind_speed: 0,
        apparent_wind_angle: 0,
        true_wind_speed: knots_to_mmps(snapshot.wind.speed),
        true_wind_direction: pack_heading(snapshot.wind.direction),
        true_wind_angle: 0,
        current_drift: 0,
        current_set: 0,
        rudder_angle: 0,
    }
}

fn event_message(snapshot: &RaceSnapshot, event: &RaceEvent) -> Option<Message> {
    match &event.data {
        RaceEventData::MarkRounded {
            source_id,
            compound_mark_id,
            gate,
            ..
        } => Some(Message::MarkRounding(MarkRounding {
            time_ms: snapshot.time_ms,
            ack: event.ack,
            race_id: snapshot.race_id,
            source_id: *source_id,
            boat_status: RoundingBoatStatus::Racing,
            side: RoundingSide::Unknown,
            mark_type: if *gate {
                RoundingMarkType::Gate
            } else {
                RoundingMarkType::Mark
            },
            mark_id: *compound_mark_id,
        })),
        RaceEventData::Collision {
            source_id,
            incident_id,
            ..
        } => Some(Message::YachtEvent(YachtEvent {
            time_ms: snapshot.time_ms,
            ack: event.ack,
            race_id: snapshot.race_id,
            source_id: *source_id,
            incident_id: *incident_id,
            event: YachtEventKind::Collision,
        })),
        // Carried by the roster in the next race status
        RaceEventData::BoatJoined { .. }
        | RaceEventData::BoatLeft { .. }
        | RaceEventData::StatusChanged { .. }
        | RaceEventData::BoatFinished { .. } => None,
    }
}

fn course_winds(snapshot: &RaceSnapshot) -> CourseWinds {
    CourseWinds {
        selected_wind_id: COURSE_WIND_ID,
        winds: vec![CourseWind {
            wind_id: COURSE_WIND_ID,
            time_ms: snapshot.time_ms,
            race_id: snapshot.race_id,
            direction: pack_heading(snapshot.wind.direction),
            speed: knots_to_mmps(snapshot.wind.speed),
            best_upwind_angle: pack_heading(snapshot.best_upwind_angle),
            best_downwind_angle: pack_heading(snapshot.best_downwind_angle),
            flags: 0,
        }],
    }
}
