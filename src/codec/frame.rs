//! Frame envelope: header, body, trailing CRC-32.
//!
//! ```text
//! offset  size  field
//!      0     1  sync1 (0x47)
//!      1     1  sync2 (0x83)
//!      2     1  message type
//!      3     6  timestamp, epoch ms
//!      9     4  source id
//!     13     2  body length
//!     15     n  body
//!   15+n     4  crc32 over bytes [0, 15+n)
//! ```

use tokio::io::{AsyncRead, AsyncReadExt};

use super::bytes::ByteWriter;
use super::error::{EncodeError, FrameError};

/// First sync byte.
pub const SYNC1: u8 = 0x47;
/// Second sync byte.
pub const SYNC2: u8 = 0x83;
/// Header length in bytes.
pub const HEADER_LEN: usize = 15;
/// Trailer length in bytes.
pub const CRC_LEN: usize = 4;
/// Offset of the body length field inside the header.
const BODY_LEN_OFFSET: usize = 13;

/// A checked but still untyped frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Raw message type code.
    pub type_code: u8,
    /// Sender timestamp, epoch milliseconds (48 bits).
    pub timestamp_ms: u64,
    /// Source identifier from the header.
    pub source_id: u32,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// Wrap `body` in a header and checksum.
pub fn encode_frame(
    type_code: u8,
    timestamp_ms: u64,
    source_id: u32,
    body: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let body_len = u16::try_from(body.len()).map_err(|_| EncodeError::BodyTooLong(body.len()))?;

    let mut w = ByteWriter::with_capacity(HEADER_LEN + body.len() + CRC_LEN);
    w.put_u8(SYNC1);
    w.put_u8(SYNC2);
    w.put_u8(type_code);
    w.put_u48(timestamp_ms);
    w.put_u32(source_id);
    w.put_u16(body_len);
    w.put_slice(body);

    let crc = crc32fast::hash(w.as_slice());
    w.put_u32(crc);
    Ok(w.into_inner())
}

/// Check a complete frame and split it into header fields and body.
pub fn decode_frame(bytes: &[u8]) -> Result<RawFrame, FrameError> {
    if bytes.len() < HEADER_LEN + CRC_LEN {
        return Err(FrameError::Truncated(bytes.len()));
    }
    if bytes[0] != SYNC1 {
        return Err(FrameError::BadSync1(bytes[0]));
    }
    if bytes[1] != SYNC2 {
        return Err(FrameError::BadSync2(bytes[1]));
    }

    let declared = declared_body_len(&bytes[..HEADER_LEN]);
    let actual = bytes.len() - HEADER_LEN - CRC_LEN;
    if declared != actual {
        return Err(FrameError::BodyLengthMismatch { declared, actual });
    }

    let crc_at = HEADER_LEN + actual;
    let computed = crc32fast::hash(&bytes[..crc_at]);
    let mut trailer = [0u8; CRC_LEN];
    trailer.copy_from_slice(&bytes[crc_at..]);
    let received = u32::from_le_bytes(trailer);
    if computed != received {
        return Err(FrameError::CrcMismatch { computed, received });
    }

    let mut timestamp = [0u8; 8];
    timestamp[..6].copy_from_slice(&bytes[3..9]);
    let source_id = u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]);

    Ok(RawFrame {
        type_code: bytes[2],
        timestamp_ms: u64::from_le_bytes(timestamp),
        source_id,
        body: bytes[HEADER_LEN..crc_at].to_vec(),
    })
}

/// Body length carried by a header slice of at least `HEADER_LEN` bytes.
pub fn declared_body_len(header: &[u8]) -> usize {
    u16::from_le_bytes([header[BODY_LEN_OFFSET], header[BODY_LEN_OFFSET + 1]]) as usize
}

/// Read exactly one frame's bytes from a stream.
///
/// Returns `Ok(None)` when the stream ends while a header is being read. A
/// stream that ends inside a body is an error. Sync bytes are not validated
/// here; `decode_frame` does that so a bad frame is reported rather than
/// silently resynchronised.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let body_len = declared_body_len(&header);
    let mut frame = vec![0u8; HEADER_LEN + body_len + CRC_LEN];
    frame[..HEADER_LEN].copy_from_slice(&header);
    reader.read_exact(&mut frame[HEADER_LEN..]).await?;
    Ok(Some(frame))
}
