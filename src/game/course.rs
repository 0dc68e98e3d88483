//! Course definition.
//!
//! The course arrives already structured: marks with positions, the order
//! in which compound marks are sailed, the boundary polygon and the pool of
//! boat ids. Course documents (regatta, race and boat descriptions) are
//! carried as opaque text and relayed to clients as they join.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::codec::XmlSubtype;
use crate::core::geo::GpsCoordinate;
use crate::game::state::SourceId;

/// Most boats a race status roster can list.
pub const MAX_PARTICIPANTS: usize = u8::MAX as usize;

/// Course validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseError {
    /// A course needs a start and a finish.
    #[error("course sequence needs at least two compound marks, got {0}")]
    SequenceTooShort(usize),

    /// The sequence names a compound mark that is not defined.
    #[error("sequence refers to unknown compound mark {0}")]
    UnknownCompoundMark(u8),

    /// Compound marks are a single mark or a two-mark gate.
    #[error("compound mark {id} has {count} marks, expected 1 or 2")]
    BadMarkCount {
        /// Compound mark id.
        id: u8,
        /// Marks found.
        count: usize,
    },

    /// There are no boat ids to hand out.
    #[error("course has no participant ids")]
    NoParticipants,

    /// More boat ids than a race status roster can carry.
    #[error("course has {0} participant ids, at most {MAX_PARTICIPANTS} fit in a roster")]
    TooManyParticipants(usize),

    /// A boat id collides with a mark id.
    #[error("source id {0} is used twice")]
    DuplicateSourceId(SourceId),
}

/// A single physical mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// Mark id, unique among marks and boats.
    pub source_id: SourceId,
    /// Display name.
    pub name: String,
    /// Position.
    pub position: GpsCoordinate,
}

/// A mark or a gate, rounded as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundMark {
    /// Compound mark id.
    pub id: u8,
    /// Display name.
    pub name: String,
    /// One mark, or two for a gate or line.
    pub marks: Vec<Mark>,
}

impl CompoundMark {
    /// Centre of the compound mark: the mark itself, or the midpoint of a gate.
    pub fn center(&self) -> GpsCoordinate {
        match self.marks.as_slice() {
            [single] => single.position,
            [a, b, ..] => a.position.midpoint(&b.position),
            [] => GpsCoordinate::default(),
        }
    }

    /// True for two-mark gates and lines.
    pub fn is_gate(&self) -> bool {
        self.marks.len() == 2
    }
}

/// Course document relayed to clients after they join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDocument {
    /// Which document this is.
    pub subtype: XmlSubtype,
    /// Document revision.
    #[serde(default)]
    pub sequence: u16,
    /// Document text.
    pub text: String,
}

/// Everything the engine needs to know about the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Every compound mark on the course.
    pub compound_marks: Vec<CompoundMark>,
    /// Compound mark ids in sailing order, start first and finish last.
    pub sequence: Vec<u8>,
    /// Course limit polygon. Empty means unbounded.
    #[serde(default)]
    pub boundary: Vec<GpsCoordinate>,
    /// Boat ids available to participants.
    pub participants: Vec<SourceId>,
    /// Documents relayed to joining clients.
    #[serde(default)]
    pub documents: Vec<CourseDocument>,
}

impl Course {
    /// Check the course is sailable.
    pub fn validate(&self) -> Result<(), CourseError> {
        if self.sequence.len() < 2 {
            return Err(CourseError::SequenceTooShort(self.sequence.len()));
        }
        for id in &self.sequence {
            if self.compound_mark(*id).is_none() {
                return Err(CourseError::UnknownCompoundMark(*id));
            }
        }
        for compound in &self.compound_marks {
            if !(1..=2).contains(&compound.marks.len()) {
                return Err(CourseError::BadMarkCount {
                    id: compound.id,
                    count: compound.marks.len(),
                });
            }
        }
        if self.participants.is_empty() {
            return Err(CourseError::NoParticipants);
        }
        // Every boat ever admitted stays on the roster
        if self.participants.len() > MAX_PARTICIPANTS {
            return Err(CourseError::TooManyParticipants(self.participants.len()));
        }

        let mut seen = std::collections::BTreeSet::new();
        let ids = self
            .marks()
            .map(|mark| mark.source_id)
            .chain(self.participants.iter().copied());
        for id in ids {
            if !seen.insert(id) {
                return Err(CourseError::DuplicateSourceId(id));
            }
        }
        Ok(())
    }

    /// Look up a compound mark by id.
    pub fn compound_mark(&self, id: u8) -> Option<&CompoundMark> {
        self.compound_marks.iter().find(|c| c.id == id)
    }

    /// Every physical mark, in definition order.
    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.compound_marks.iter().flat_map(|c| c.marks.iter())
    }

    /// Number of legs: one fewer than the marks in the sequence.
    pub fn leg_count(&self) -> usize {
        self.sequence.len().saturating_sub(1)
    }

    /// Compound mark that ends `leg`.
    pub fn leg_end(&self, leg: usize) -> Option<&CompoundMark> {
        self.sequence
            .get(leg + 1)
            .and_then(|id| self.compound_mark(*id))
    }

    /// The start line or mark.
    pub fn start(&self) -> Option<&CompoundMark> {
        self.sequence.first().and_then(|id| self.compound_mark(*id))
    }

    /// Documents to relay on join. A course configured without any gets a
    /// race document generated from its geometry.
    pub fn join_documents(&self, race_id: u32) -> Vec<CourseDocument> {
        if self.documents.is_empty() {
            vec![self.race_document(race_id)]
        } else {
            self.documents.clone()
        }
    }

    /// Race document describing this course's marks, sequence and limits.
    pub fn race_document(&self, race_id: u32) -> CourseDocument {
        let mut xml = String::new();
        let _ = writeln!(xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>");
        let _ = writeln!(xml, "<Race>");
        let _ = writeln!(xml, "  <RaceID>{}</RaceID>", race_id);
        let _ = writeln!(xml, "  <Participants>");
        for id in &self.participants {
            let _ = writeln!(xml, "    <Yacht SourceID=\"{}\"/>", id);
        }
        let _ = writeln!(xml, "  </Participants>");
        let _ = writeln!(xml, "  <Course>");
        for compound in &self.compound_marks {
            let _ = writeln!(
                xml,
                "    <CompoundMark CompoundMarkID=\"{}\" Name=\"{}\">",
                compound.id, compound.name
            );
            for (seq, mark) in compound.marks.iter().enumerate() {
                let _ = writeln!(
                    xml,
                    "      <Mark SeqId=\"{}\" Name=\"{}\" TargetLat=\"{:.6}\" TargetLng=\"{:.6}\" SourceID=\"{}\"/>",
                    seq + 1,
                    mark.name,
                    mark.position.latitude,
                    mark.position.longitude,
                    mark.source_id
                );
            }
            let _ = writeln!(xml, "    </CompoundMark>");
        }
        let _ = writeln!(xml, "  </Course>");
        let _ = writeln!(xml, "  <CompoundMarkSequence>");
        for (seq, id) in self.sequence.iter().enumerate() {
            let _ = writeln!(xml, "    <Corner SeqID=\"{}\" CompoundMarkID=\"{}\"/>", seq + 1, id);
        }
        let _ = writeln!(xml, "  </CompoundMarkSequence>");
        let _ = writeln!(xml, "  <CourseLimit>");
        for (seq, point) in self.boundary.iter().enumerate() {
            let _ = writeln!(
                xml,
                "    <Limit SeqID=\"{}\" Lat=\"{:.6}\" Lon=\"{:.6}\"/>",
                seq + 1,
                point.latitude,
                point.longitude
            );
        }
        let _ = writeln!(xml, "  </CourseLimit>");
        xml.push_str("</Race>\n");

        CourseDocument {
            subtype: XmlSubtype::Race,
            sequence: 1,
            text: xml,
        }
    }
}

fn mark(source_id: SourceId, name: &str, latitude: f64, longitude: f64) -> Mark {
    Mark {
        source_id,
        name: name.to_string(),
        position: GpsCoordinate::new(latitude, longitude),
    }
}

impl Default for Course {
    /// A windward-leeward course on the Waitemata Harbour.
    fn default() -> Self {
        let compound_marks = vec![
            CompoundMark {
                id: 1,
                name: "Start Line".to_string(),
                marks: vec![
                    mark(101, "Start PRO", -36.84000, 174.76800),
                    mark(102, "Start Pin", -36.84000, 174.77200),
                ],
            },
            CompoundMark {
                id: 2,
                name: "Windward".to_string(),
                marks: vec![mark(103, "Windward", -36.82800, 174.77000)],
            },
            CompoundMark {
                id: 3,
                name: "Leeward Gate".to_string(),
                marks: vec![
                    mark(104, "Leeward Port", -36.83700, 174.76850),
                    mark(105, "Leeward Starboard", -36.83700, 174.77150),
                ],
            },
            CompoundMark {
                id: 4,
                name: "Finish Line".to_string(),
                marks: vec![
                    mark(106, "Finish PRO", -36.82500, 174.76850),
                    mark(107, "Finish Pin", -36.82500, 174.77150),
                ],
            },
        ];

        Self {
            compound_marks,
            sequence: vec![1, 2, 3, 4],
            boundary: vec![
                GpsCoordinate::new(-36.84400, 174.76200),
                GpsCoordinate::new(-36.84400, 174.77800),
                GpsCoordinate::new(-36.82100, 174.77800),
                GpsCoordinate::new(-36.82100, 174.76200),
            ],
            participants: (121..=126).collect(),
            documents: Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
