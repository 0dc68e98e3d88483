//! Message type codes and the enumerated fields carried in message bodies.

use serde::{Deserialize, Serialize};

/// Declare a `u8`-backed wire enumeration with checked conversion from a byte.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Look up a variant by its wire byte.
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Wire byte for this variant.
            #[inline]
            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum! {
    /// Closed set of message types this server speaks.
    pub enum MessageType {
        /// Liveness ping.
        Heartbeat = 1,
        /// Race phase, wind and roster.
        RaceStatus = 12,
        /// Opaque course description text.
        XmlMessage = 26,
        /// Start time notification.
        RaceStartStatus = 27,
        /// Incident report (collisions).
        YachtEvent = 29,
        /// Position and motion of one boat or mark.
        BoatLocation = 37,
        /// A boat rounded a mark.
        MarkRounding = 38,
        /// Wind at the course reference points.
        CourseWinds = 44,
        /// Rolling wind speed averages.
        AverageWind = 47,
        /// Client control input.
        BoatAction = 100,
        /// Client asks to join the race.
        RequestToJoin = 101,
        /// Server answers a join request.
        JoinAcceptance = 102,
        /// Boat health.
        BoatState = 103,
    }
}

wire_enum! {
    /// Race status of a single boat.
    pub enum BoatStatus {
        /// Not yet known.
        Undefined = 0,
        /// Waiting for the start.
        Prestart = 1,
        /// On the course.
        Racing = 2,
        /// Crossed the finish.
        Finished = 3,
        /// Did not start.
        DidNotStart = 4,
        /// Did not finish.
        DidNotFinish = 5,
        /// Disqualified.
        Disqualified = 6,
        /// On course side at the start.
        OnCourseSide = 7,
    }
}

wire_enum! {
    /// Control inputs a client can send.
    pub enum BoatActionKind {
        /// Toggle the auto-VMG pilot.
        Vmg = 1,
        /// Luff the sails.
        SailsIn = 2,
        /// Power up the sails.
        SailsOut = 3,
        /// Tack or gybe through the wind axis.
        TackGybe = 4,
        /// Nudge towards the wind.
        Upwind = 5,
        /// Nudge away from the wind.
        Downwind = 6,
        /// Client-side camera control.
        ZoomIn = 7,
        /// Client-side camera control.
        ZoomOut = 8,
        /// Flip sails between in and out.
        ToggleSails = 9,
    }
}

wire_enum! {
    /// Role requested in a join request.
    pub enum JoinRole {
        /// Watch only.
        Spectator = 0,
        /// Sail a boat.
        Participant = 1,
        /// Sail a boat in a private practice race.
        ControlTutorial = 2,
        /// Sail a boat that does not collide.
        Ghost = 3,
    }
}

wire_enum! {
    /// Outcome carried by a join acceptance.
    pub enum JoinAcceptanceKind {
        /// Joined as a spectator.
        Spectator = 0,
        /// Joined as a participant with a boat.
        Participant = 1,
        /// Joined a tutorial race.
        Tutorial = 2,
        /// Joined as a ghost boat.
        Ghost = 3,
        /// The race cannot take this client.
        JoinFailure = 0x10,
        /// No capacity left.
        ServerFull = 0x11,
    }
}

impl JoinAcceptanceKind {
    /// True for every success variant.
    pub fn is_success(self) -> bool {
        !matches!(self, Self::JoinFailure | Self::ServerFull)
    }

    /// True when the accepted client controls a boat.
    pub fn has_boat(self) -> bool {
        matches!(self, Self::Participant | Self::Tutorial | Self::Ghost)
    }
}

wire_enum! {
    /// Race phase.
    pub enum RaceStatusKind {
        /// Race not running.
        NotActive = 0,
        /// Between thirty and ten seconds to go.
        Warning = 1,
        /// Under ten seconds to go.
        Preparatory = 2,
        /// Racing.
        Started = 3,
        /// Every boat is done.
        Finished = 4,
        /// Race retired.
        Retired = 5,
        /// Race abandoned.
        Abandoned = 6,
        /// Race postponed.
        Postponed = 7,
        /// Race terminated.
        Terminated = 8,
        /// No start time yet.
        StartTimeNotSet = 9,
        /// More than thirty seconds to go.
        Prestart = 10,
    }
}

wire_enum! {
    /// Race format.
    pub enum RaceType {
        /// Two boats.
        MatchRace = 1,
        /// Any number of boats.
        FleetRace = 2,
    }
}

wire_enum! {
    /// Kind of device a location report describes.
    pub enum DeviceType {
        /// Unknown device.
        Unknown = 0,
        /// A competing boat.
        RacingYacht = 1,
        /// Race committee boat.
        CommitteeBoat = 2,
        /// Course mark.
        Mark = 3,
        /// Start or finish line pin.
        Pin = 4,
        /// Chase boat.
        ChaseBoat = 5,
        /// Medical boat.
        MedicalBoat = 6,
        /// Marshall boat.
        MarshallBoat = 7,
        /// Umpire boat.
        UmpireBoat = 8,
        /// Umpire software.
        UmpireSoftware = 9,
        /// Principal race officer software.
        PrincipalRaceOfficer = 10,
        /// Weather station.
        WeatherStation = 11,
        /// Helicopter.
        Helicopter = 12,
        /// Data processing software.
        DataProcessing = 13,
    }
}

wire_enum! {
    /// Status of a boat at a mark rounding.
    pub enum RoundingBoatStatus {
        /// Unknown.
        Unknown = 0,
        /// Racing.
        Racing = 1,
        /// Disqualified.
        Disqualified = 2,
        /// Withdrawn.
        Withdrawn = 3,
    }
}

wire_enum! {
    /// Side a mark was left on.
    pub enum RoundingSide {
        /// Unknown.
        Unknown = 0,
        /// Left to port.
        Port = 1,
        /// Left to starboard.
        Starboard = 2,
    }
}

wire_enum! {
    /// Single mark or two-mark gate.
    pub enum RoundingMarkType {
        /// Unknown.
        Unknown = 0,
        /// Single mark.
        Mark = 1,
        /// Gate between two marks.
        Gate = 2,
    }
}

wire_enum! {
    /// Race start notification kind.
    pub enum RaceStartKind {
        /// A start time was set.
        SetRaceStart = 1,
        /// Start postponed.
        Postponed = 2,
        /// Race abandoned.
        Abandoned = 3,
        /// Race terminated.
        Terminated = 4,
    }
}

wire_enum! {
    /// Incident codes carried by a yacht event.
    pub enum YachtEventKind {
        /// Two boats, or a boat and a mark, touched.
        Collision = 1,
    }
}

wire_enum! {
    /// Which course document an XML message carries.
    pub enum XmlSubtype {
        /// Regatta description.
        Regatta = 5,
        /// Race and course description.
        Race = 6,
        /// Boat roster.
        Boat = 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_codes() {
        assert_eq!(MessageType::from_u8(1), Some(MessageType::Heartbeat));
        assert_eq!(MessageType::from_u8(37), Some(MessageType::BoatLocation));
        assert_eq!(MessageType::from_u8(103), Some(MessageType::BoatState));
        assert_eq!(MessageType::from_u8(0), None);
        assert_eq!(MessageType::from_u8(200), None);
        assert_eq!(MessageType::JoinAcceptance.as_u8(), 102);
    }

    #[test]
    fn test_join_acceptance_classification() {
        assert!(JoinAcceptanceKind::Spectator.is_success());
        assert!(!JoinAcceptanceKind::Spectator.has_boat());
        assert!(JoinAcceptanceKind::Ghost.has_boat());
        assert!(!JoinAcceptanceKind::ServerFull.is_success());
        assert_eq!(JoinAcceptanceKind::from_u8(0x11), Some(JoinAcceptanceKind::ServerFull));
        assert_eq!(JoinAcceptanceKind::from_u8(0x12), None);
    }

    #[test]
    fn test_action_codes() {
        assert_eq!(BoatActionKind::from_u8(4), Some(BoatActionKind::TackGybe));
        assert_eq!(BoatActionKind::from_u8(9), Some(BoatActionKind::ToggleSails));
        assert_eq!(BoatActionKind::from_u8(10), None);
    }
}
