//! Codec error types.

use super::types::MessageType;

/// Envelope-level failures. Any of these condemns the whole frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than a header plus checksum.
    #[error("frame truncated: {0} bytes is shorter than header plus checksum")]
    Truncated(usize),

    /// First sync byte wrong.
    #[error("bad first sync byte {0:#04x}")]
    BadSync1(u8),

    /// Second sync byte wrong.
    #[error("bad second sync byte {0:#04x}")]
    BadSync2(u8),

    /// Header body length disagrees with the bytes actually present.
    #[error("body length field is {declared} but {actual} body bytes are present")]
    BodyLengthMismatch {
        /// Length carried in the header.
        declared: usize,
        /// Length found between header and checksum.
        actual: usize,
    },

    /// Trailing checksum disagrees with the computed one.
    #[error("crc mismatch: computed {computed:#010x}, frame carries {received:#010x}")]
    CrcMismatch {
        /// CRC computed over header and body.
        computed: u32,
        /// CRC read from the frame trailer.
        received: u32,
    },
}

/// Failure to turn a frame into a typed message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The envelope itself is malformed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Body ended before its layout did.
    #[error("body too short: needed {needed} bytes, have {available}")]
    BodyTooShort {
        /// Offset the reader needed to reach.
        needed: usize,
        /// Body length.
        available: usize,
    },

    /// Fixed-layout body had bytes left over.
    #[error("{0} unexpected trailing body bytes")]
    TrailingBytes(usize),

    /// A field held a value outside its enumeration.
    #[error("invalid {field} value {value} in {message:?}")]
    InvalidField {
        /// Message being decoded.
        message: MessageType,
        /// Field name.
        field: &'static str,
        /// Offending raw value.
        value: i64,
    },

    /// Text payload was not UTF-8.
    #[error("{0:?} text payload is not valid UTF-8")]
    InvalidText(MessageType),
}

impl DecodeError {
    /// True for envelope failures (sync, length, checksum).
    pub fn is_frame_error(&self) -> bool {
        matches!(self, DecodeError::Frame(_))
    }

    pub(crate) fn invalid(message: MessageType, field: &'static str, value: impl Into<i64>) -> Self {
        DecodeError::InvalidField {
            message,
            field,
            value: value.into(),
        }
    }
}

/// Failure to serialize a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Body exceeds the 16-bit length field.
    #[error("body of {0} bytes does not fit a 16-bit length field")]
    BodyTooLong(usize),

    /// A count-prefixed list is longer than one byte can express.
    #[error("{count} {what} exceed the one-byte count field")]
    TooMany {
        /// What was being counted.
        what: &'static str,
        /// How many there were.
        count: usize,
    },
}
