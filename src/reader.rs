//! Forward-only binary reader for decoding W3G replay data.
//!
//! [`ByteReader`] is a cursor over a byte slice. Every read consumes exactly
//! the bytes it declares and advances the cursor; nothing ever rewinds. All
//! multi-byte integers in the W3G container are little-endian.
//!
//! Short reads are fatal: any operation that cannot obtain its declared byte
//! count returns [`DecodeError::UnexpectedEof`] and the whole decode aborts.
//!
//! # Example
//!
//! ```
//! use w3g_replay::reader::ByteReader;
//!
//! let data = [0x26, 0x89, 0x01, 0x00, b'H', b'i', 0x00];
//! let mut reader = ByteReader::new(&data);
//!
//! assert_eq!(reader.read_u32_le().unwrap(), 0x0001_8926);
//! assert_eq!(reader.read_cstring().unwrap(), "Hi");
//! assert!(reader.is_empty());
//! ```

use crate::error::{DecodeError, Result};

/// A destructive cursor over replay bytes.
///
/// One reader is created per buffer (the raw file for the header and block
/// framing, the decompressed body for the record stream, plus nested readers
/// for length-prefixed sub-blocks). [`position`](ByteReader::position) gives
/// the bytes consumed so far, which error reporting uses as the approximate
/// offset of a failure.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Returns the number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns whether the reader has been fully consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the next byte without consuming it, or `None` at the end.
    #[must_use]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Consumes and returns the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::unexpected_eof(
                self.pos + len,
                self.data.len(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Consumes `len` bytes without returning them.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` at the end of the data.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a little-endian u16.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than 2 bytes remain.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian 32-bit float.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32_le()?))
    }

    /// Reads `len` bytes and decodes them in reverse order as a string.
    ///
    /// Version tags are stored byte-reversed on disk ("3RAW" for "WAR3"),
    /// so reversing recovers the printable form.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn read_reversed_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
        Ok(String::from_utf8_lossy(&reversed).into_owned())
    }

    /// Reads bytes up to (and consuming) a null terminator.
    ///
    /// The terminator is not included in the returned slice.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if no null byte remains.
    pub fn read_cstring_bytes(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(nul) => {
                let slice = &rest[..nul];
                self.pos += nul + 1;
                Ok(slice)
            }
            None => Err(DecodeError::unexpected_eof(
                self.data.len() + 1,
                self.data.len(),
            )),
        }
    }

    /// Reads a null-terminated string.
    ///
    /// Player names and chat in old replays are not reliably UTF-8, so
    /// invalid sequences are replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if no null byte remains.
    pub fn read_cstring(&mut self) -> Result<String> {
        let bytes = self.read_cstring_bytes()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads a string prefixed by a 1-byte length (no terminator).
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::UnexpectedEof` if the data is truncated.
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads a byte and asserts it equals `expected`.
    ///
    /// # Errors
    ///
    /// - `DecodeError::UnexpectedEof` at the end of the data
    /// - `DecodeError::ValueMismatch` if the byte differs
    pub fn expect_u8(&mut self, expected: u8) -> Result<()> {
        let actual = self.read_u8()?;
        if actual != expected {
            return Err(DecodeError::value_mismatch(expected, actual));
        }
        Ok(())
    }

    /// Reads a little-endian u16 and asserts it equals `expected`.
    ///
    /// # Errors
    ///
    /// - `DecodeError::UnexpectedEof` if fewer than 2 bytes remain
    /// - `DecodeError::ValueMismatch` if the value differs
    pub fn expect_u16_le(&mut self, expected: u16) -> Result<()> {
        let actual = self.read_u16_le()?;
        if actual != expected {
            return Err(DecodeError::value_mismatch(expected, actual));
        }
        Ok(())
    }

    /// Reads a little-endian u32 and asserts it equals `expected`.
    ///
    /// # Errors
    ///
    /// - `DecodeError::UnexpectedEof` if fewer than 4 bytes remain
    /// - `DecodeError::ValueMismatch` if the value differs
    pub fn expect_u32_le(&mut self, expected: u32) -> Result<()> {
        let actual = self.read_u32_le()?;
        if actual != expected {
            return Err(DecodeError::value_mismatch(expected, actual));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================
    // integer reads
    // ========================

    #[test]
    fn test_read_u8() {
        let mut r = ByteReader::new(&[0xAB, 0xCD]);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u8().unwrap(), 0xCD);
        assert!(matches!(
            r.read_u8(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_read_u16_le() {
        let mut r = ByteReader::new(&[0x34, 0x12, 0xFF, 0xFF]);
        assert_eq!(r.read_u16_le().unwrap(), 0x1234);
        assert_eq!(r.read_u16_le().unwrap(), 0xFFFF);
    }

    #[test]
    fn test_read_u16_le_truncated() {
        let mut r = ByteReader::new(&[0x34]);
        assert!(matches!(
            r.read_u16_le(),
            Err(DecodeError::UnexpectedEof {
                expected: 2,
                available: 1
            })
        ));
    }

    #[test]
    fn test_read_u32_le() {
        let mut r = ByteReader::new(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(r.read_u32_le().unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_read_u32_le_real_file_size() {
        // File size 100,646 stored as: 26 89 01 00
        let mut r = ByteReader::new(&[0x26, 0x89, 0x01, 0x00]);
        assert_eq!(r.read_u32_le().unwrap(), 100_646);
    }

    #[test]
    fn test_read_f32_le() {
        let binding = 1.5f32.to_le_bytes();
        let mut r = ByteReader::new(&binding);
        assert_eq!(r.read_f32_le().unwrap(), 1.5);
    }

    // ========================
    // cursor behavior
    // ========================

    #[test]
    fn test_position_and_remaining() {
        let mut r = ByteReader::new(&[1, 2, 3, 4, 5]);
        assert_eq!(r.position(), 0);
        assert_eq!(r.remaining(), 5);

        r.read_u16_le().unwrap();
        assert_eq!(r.position(), 2);
        assert_eq!(r.remaining(), 3);

        r.skip(3).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn test_failed_read_does_not_advance() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        assert!(r.read_u32_le().is_err());
        assert_eq!(r.position(), 0);
        // a smaller read still succeeds afterwards
        assert_eq!(r.read_u16_le().unwrap(), 0x0201);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut r = ByteReader::new(&[0x0A, 0x0B]);
        assert_eq!(r.peek_u8(), Some(0x0A));
        assert_eq!(r.peek_u8(), Some(0x0A));
        assert_eq!(r.read_u8().unwrap(), 0x0A);
        r.skip(1).unwrap();
        assert_eq!(r.peek_u8(), None);
    }

    #[test]
    fn test_read_bytes_zero_length() {
        let mut r = ByteReader::new(b"W3XP");
        assert_eq!(r.read_bytes(0).unwrap(), &[] as &[u8]);
        assert_eq!(r.position(), 0);
    }

    // ========================
    // strings
    // ========================

    #[test]
    fn test_read_cstring_basic() {
        let mut r = ByteReader::new(b"Hello\x00World\x00");
        assert_eq!(r.read_cstring().unwrap(), "Hello");
        assert_eq!(r.read_cstring().unwrap(), "World");
        assert!(r.is_empty());
    }

    #[test]
    fn test_read_cstring_empty() {
        let mut r = ByteReader::new(b"\x00rest");
        assert_eq!(r.read_cstring().unwrap(), "");
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_read_cstring_missing_terminator() {
        let mut r = ByteReader::new(b"Hello");
        assert!(matches!(
            r.read_cstring(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_read_cstring_non_utf8_is_lossy() {
        // Latin-1 player names show up in old replays; they decode lossily
        // instead of failing the whole replay.
        let mut r = ByteReader::new(&[0xFF, 0xFE, 0x00, 0x41]);
        let s = r.read_cstring().unwrap();
        assert!(!s.is_empty());
        assert_eq!(r.read_u8().unwrap(), 0x41);
    }

    #[test]
    fn test_read_reversed_string() {
        // Expansion tags are stored byte-reversed
        let mut r = ByteReader::new(b"PX3W");
        assert_eq!(r.read_reversed_string(4).unwrap(), "W3XP");

        let mut r = ByteReader::new(b"3RAW");
        assert_eq!(r.read_reversed_string(4).unwrap(), "WAR3");
    }

    #[test]
    fn test_read_length_prefixed_string() {
        let mut r = ByteReader::new(b"\x04clanX");
        assert_eq!(r.read_length_prefixed_string().unwrap(), "clan");
        assert_eq!(r.read_u8().unwrap(), b'X');
    }

    #[test]
    fn test_read_length_prefixed_string_truncated() {
        let mut r = ByteReader::new(b"\x0Ashort");
        assert!(matches!(
            r.read_length_prefixed_string(),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    // ========================
    // expect-equal asserts
    // ========================

    #[test]
    fn test_expect_u8() {
        let mut r = ByteReader::new(&[0x00, 0x07]);
        assert!(r.expect_u8(0).is_ok());
        assert!(matches!(
            r.expect_u8(0),
            Err(DecodeError::ValueMismatch {
                expected: 0,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_expect_u16_le() {
        let mut r = ByteReader::new(&[0x00, 0x00, 0x34, 0x12]);
        assert!(r.expect_u16_le(0).is_ok());
        assert!(matches!(
            r.expect_u16_le(0),
            Err(DecodeError::ValueMismatch { actual: 0x1234, .. })
        ));
    }

    #[test]
    fn test_expect_u32_le() {
        let mut r = ByteReader::new(&[0x01, 0x00, 0x00, 0x00]);
        assert!(r.expect_u32_le(1).is_ok());
    }

    #[test]
    fn test_expect_u32_le_mismatch() {
        let mut r = ByteReader::new(&[0x02, 0x00, 0x00, 0x00]);
        assert!(matches!(
            r.expect_u32_le(1),
            Err(DecodeError::ValueMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }
}
