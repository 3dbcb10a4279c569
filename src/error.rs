//! Error types for the W3G replay decoder.
//!
//! This module defines the error hierarchy for all failure cases during
//! decoding: I/O and short reads, format validation failures, decompression
//! mismatches, and structural inconsistencies in the record stream.
//!
//! Fatal errors abort the whole decode; there is no retry and no partially
//! decoded `Replay` is ever returned. Advisory conditions (unknown trailing
//! blocks, tolerated sanity bytes) are logged instead of raised.

use thiserror::Error;

/// The main error type for W3G replay decoding operations.
///
/// This enum covers all fatal conditions a decode can hit:
/// - File I/O failures when reading from a source
/// - Truncated data (a primitive read could not obtain its declared bytes)
/// - Invalid or unrecognized magic bytes
/// - Exact-value assertions that found something else
/// - Malformed records and failed identity cross-checks
/// - Per-block decompression failures
///
/// # Example
///
/// ```
/// use w3g_replay::error::{DecodeError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(DecodeError::invalid_record("missing slot table"))
/// }
/// ```
#[derive(Error, Debug)]
pub enum DecodeError {
    /// An I/O error occurred while reading the replay source.
    ///
    /// This wraps standard library I/O errors for seamless error propagation
    /// using the `?` operator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data ended before the required bytes could be read.
    ///
    /// This typically indicates a truncated replay file.
    #[error("unexpected end of data: needed {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The number of bytes that were needed.
        expected: usize,
        /// The actual number of bytes available.
        available: usize,
    },

    /// The file does not start with the W3G magic string.
    #[error("not a replay file: expected magic {expected}, found {found}")]
    InvalidMagic {
        /// The expected magic bytes (as hex string for display).
        expected: String,
        /// The actual bytes found at the start of the file (as hex string).
        found: String,
    },

    /// An exact-value assertion failed.
    ///
    /// Raised by the `expect_*` reads when a field that must hold a fixed
    /// value holds something else.
    #[error("value mismatch: expected 0x{expected:X}, found 0x{actual:X}")]
    ValueMismatch {
        /// The value the format requires at this position.
        expected: u64,
        /// The value actually read.
        actual: u64,
    },

    /// A record is malformed or structurally inconsistent.
    ///
    /// Covers record tags outside the known set, lookup-table misses
    /// (slot status, race, color), and failed player/slot identity
    /// cross-checks.
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// A description of what makes the record invalid.
        reason: String,
    },

    /// Decompression of a data block failed or produced the wrong length.
    #[error("block {block}: decompression failed: {reason}")]
    Decompression {
        /// Index of the offending block.
        block: usize,
        /// A description of the decompression failure.
        reason: String,
    },

    /// A child error wrapped with the decode sub-step that hit it.
    #[error("error in {what}: {source}")]
    Context {
        /// The sub-step that was running when the error occurred.
        what: String,
        /// The underlying error.
        #[source]
        source: Box<DecodeError>,
    },

    /// A child error tagged with the approximate position in the
    /// decompressed stream at which decoding failed.
    #[error("error in decompressed data at/before 0x{offset:X}: {source}")]
    AtOffset {
        /// Bytes consumed from the decompressed stream when the error hit.
        offset: usize,
        /// The underlying error.
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Creates an `UnexpectedEof` error with the given sizes.
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        DecodeError::UnexpectedEof {
            expected,
            available,
        }
    }

    /// Creates an `InvalidMagic` error with the given byte slices.
    ///
    /// The bytes are converted to hex strings for human-readable display.
    #[must_use]
    pub fn invalid_magic(expected: &[u8], found: &[u8]) -> Self {
        DecodeError::InvalidMagic {
            expected: bytes_to_hex(expected),
            found: bytes_to_hex(found),
        }
    }

    /// Creates a `ValueMismatch` error from any integer pair.
    #[must_use]
    pub fn value_mismatch(expected: impl Into<u64>, actual: impl Into<u64>) -> Self {
        DecodeError::ValueMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an `InvalidRecord` error with the given reason.
    #[must_use]
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        DecodeError::InvalidRecord {
            reason: reason.into(),
        }
    }

    /// Creates a `Decompression` error naming the offending block.
    #[must_use]
    pub fn decompression(block: usize, reason: impl Into<String>) -> Self {
        DecodeError::Decompression {
            block,
            reason: reason.into(),
        }
    }

    /// Wraps this error with the decode sub-step that hit it.
    #[must_use]
    pub fn context(self, what: impl Into<String>) -> Self {
        DecodeError::Context {
            what: what.into(),
            source: Box::new(self),
        }
    }

    /// Wraps this error with the position in the decompressed stream.
    #[must_use]
    pub fn at_offset(self, offset: usize) -> Self {
        DecodeError::AtOffset {
            offset,
            source: Box::new(self),
        }
    }
}

/// Extension trait adding sub-step context to decode results.
///
/// Lets every stage of the record stream decoder wrap child errors, so a
/// failure reads as "error in chat body: unexpected end of data ...".
pub trait ResultExt<T> {
    /// Wraps the error side with the decode sub-step that produced it.
    fn context(self, what: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, what: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(what))
    }
}

/// Converts a byte slice to a hexadecimal string representation.
///
/// If the slice is 8 bytes or less, formats as space-separated hex values.
/// If longer, shows the first 8 bytes followed by "...".
fn bytes_to_hex(bytes: &[u8]) -> String {
    if bytes.len() <= 8 {
        bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        let prefix: String = bytes[..8]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{prefix}... ({} bytes total)", bytes.len())
    }
}

/// A specialized Result type for W3G decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
