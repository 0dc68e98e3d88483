//! Little-endian primitive readers and writers.
//!
//! Every multi-byte integer on the wire goes through these two types, which
//! pins byte order for the whole protocol in one place.

use super::error::{DecodeError, EncodeError};

/// Append-only little-endian buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    /// Write one byte.
    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a little-endian u16.
    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian i16.
    pub fn put_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a little-endian i32.
    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write the low 48 bits of `v`, little-endian.
    pub fn put_u48(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes()[..6]);
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a collection length as a single count byte.
    pub fn put_count(&mut self, count: usize, what: &'static str) -> Result<(), EncodeError> {
        let count = u8::try_from(count).map_err(|_| EncodeError::TooMany { what, count })?;
        self.put_u8(count);
        Ok(())
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes written so far, borrowed.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return its buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed little-endian buffer.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(DecodeError::BodyTooShort {
                needed: end,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read one byte.
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian u16.
    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian i16.
    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    /// Read a little-endian u32.
    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// Read a little-endian i32.
    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    /// Read a 48-bit little-endian unsigned integer.
    pub fn u48(&mut self) -> Result<u64, DecodeError> {
        let six: [u8; 6] = self.array()?;
        let mut wide = [0u8; 8];
        wide[..6].copy_from_slice(&six);
        Ok(u64::from_le_bytes(wide))
    }

    /// Read `n` raw bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail if anything is left over after a fixed-layout body.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(DecodeError::TrailingBytes(extra)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut w = ByteWriter::new();
        w.put_u16(0x0102);
        w.put_u32(0x0A0B_0C0D);
        w.put_u48(0x0000_1122_3344_5566);
        assert_eq!(
            w.into_inner(),
            vec![0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
        );
    }

    #[test]
    fn test_u48_drops_high_bits() {
        let mut w = ByteWriter::new();
        w.put_u48(u64::MAX);
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 6);
        assert_eq!(ByteReader::new(&bytes).u48().unwrap(), (1 << 48) - 1);
    }

    #[test]
    fn test_signed_values() {
        let mut w = ByteWriter::new();
        w.put_i16(-2);
        w.put_i32(-70_000);
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.i16().unwrap(), -2);
        assert_eq!(r.i32().unwrap(), -70_000);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_short_read() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert_eq!(r.u16().unwrap(), 0x0201);
        assert!(matches!(r.u32(), Err(DecodeError::BodyTooShort { needed: 6, available: 3 })));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        r.u8().unwrap();
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn test_count_overflow() {
        let mut w = ByteWriter::new();
        assert!(w.put_count(255, "boats").is_ok());
        assert!(matches!(
            w.put_count(256, "boats"),
            Err(EncodeError::TooMany { what: "boats", count: 256 })
        ));
    }
}
