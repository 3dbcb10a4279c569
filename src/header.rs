//! Header decoding for W3G replay files.
//!
//! Every replay starts with a 28-byte magic string, a fixed prefix of size
//! fields, and one of two sub-header layouts selected by a version field:
//!
//! | Offset | Size | Field | Notes |
//! |--------|------|-------|-------|
//! | 0x00 | 28 | magic | `"Warcraft III recorded game\x1A\x00"` |
//! | 0x1C | 4 | header size | 0x40 (legacy) or 0x44 (versioned) |
//! | 0x20 | 4 | compressed size | informational only |
//! | 0x24 | 4 | sub-header version | 0 or 1; anything else is fatal |
//! | 0x28 | 4 | decompressed size | informational only |
//! | 0x2C | 4 | block count | number of framed compressed blocks |
//!
//! Sub-header 0 (patch 1.06 and below) and sub-header 1 differ only in what
//! precedes the shared tail of version, build number, flags, duration, and
//! checksum: layout 1 opens with a byte-reversed 4-character expansion tag
//! ("WAR3" or "W3XP"), layout 0 opens with an unknown 16-bit field and
//! stores the version in 16 bits.
//!
//! The header is transient: it seeds the [`Replay`](crate::Replay) fields
//! and tells the decompressor how many blocks to expect, and is not
//! retained afterwards.

use log::warn;

use crate::error::{DecodeError, Result, ResultExt};
use crate::reader::ByteReader;
use crate::tables::Expansion;

/// The magic string opening every classic replay container (28 bytes).
pub const REPLAY_MAGIC: &[u8; 28] = b"Warcraft III recorded game\x1A\x00";

/// First game version whose blocks use 32-bit framing fields.
pub const NEW_BLOCK_FORMAT_VERSION: u32 = 10032;

/// Parsed replay header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Declared header length (0x40 or 0x44 expected; others are logged
    /// as suspicious but tolerated).
    pub header_size: u32,

    /// Which sub-header layout followed the shared prefix (0 or 1).
    pub sub_header_version: u32,

    /// Number of framed compressed blocks making up the replay body.
    pub block_count: u32,

    /// Numeric game version. Gates several field layouts downstream.
    pub version: u32,

    /// Build number of the recording client.
    pub build_number: u16,

    /// Which release recorded the replay. Defaults to Reign of Chaos when
    /// the expansion tag is absent (layout 0) or unrecognized.
    pub expansion: Expansion,

    /// Whether the flags word marked this as a multiplayer game.
    pub is_multiplayer: bool,

    /// Replay duration in milliseconds.
    pub duration_ms: u32,
}

impl Header {
    /// Decodes the header, consuming it from the reader.
    ///
    /// On success the reader is positioned at the first framed block.
    ///
    /// # Errors
    ///
    /// - `DecodeError::InvalidMagic` if the magic string does not match
    /// - `DecodeError::InvalidRecord` for an unsupported sub-header version
    /// - `DecodeError::UnexpectedEof` if the data is truncated
    pub fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let magic = r.read_bytes(REPLAY_MAGIC.len()).context("magic string")?;
        if magic != REPLAY_MAGIC {
            return Err(DecodeError::invalid_magic(REPLAY_MAGIC, magic));
        }

        let header_size = r.read_u32_le().context("header size")?;
        if header_size != 0x40 && header_size != 0x44 {
            warn!("unexpected header size: 0x{header_size:X}");
        }

        // total compressed size, informational only
        r.read_u32_le().context("compressed file size")?;

        let sub_header_version = r.read_u32_le().context("sub-header version")?;

        // total decompressed size, informational only
        r.read_u32_le().context("decompressed data size")?;

        let block_count = r.read_u32_le().context("block count")?;

        let mut expansion = Expansion::default();
        let version;
        let build_number;
        let flags;
        let duration_ms;

        match sub_header_version {
            0 => {
                r.read_u16_le().context("sub-header unknown field")?;
                version = u32::from(r.read_u16_le().context("version number")?);
                build_number = r.read_u16_le().context("build number")?;
                flags = r.read_u16_le().context("flags")?;
                duration_ms = r.read_u32_le().context("replay duration")?;
                r.read_u32_le().context("checksum")?;
            }
            1 => {
                let tag = r.read_reversed_string(4).context("version identifier")?;
                match tag.as_str() {
                    "WAR3" => expansion = Expansion::ReignOfChaos,
                    "W3XP" => expansion = Expansion::TheFrozenThrone,
                    _ => {}
                }
                version = r.read_u32_le().context("version number")?;
                build_number = r.read_u16_le().context("build number")?;
                flags = r.read_u16_le().context("flags")?;
                duration_ms = r.read_u32_le().context("replay duration")?;
                r.read_u32_le().context("checksum")?;
            }
            other => {
                return Err(DecodeError::invalid_record(format!(
                    "unsupported sub-header version: 0x{other:X}"
                )));
            }
        }

        Ok(Header {
            header_size,
            sub_header_version,
            block_count,
            version,
            build_number,
            expansion,
            is_multiplayer: flags & 0x8000 != 0,
            duration_ms,
        })
    }

    /// Whether the block framing uses the widened 32-bit fields.
    #[must_use]
    pub fn uses_new_block_format(&self) -> bool {
        self.version >= NEW_BLOCK_FORMAT_VERSION
    }

    /// Converts the duration into (hours, minutes, seconds, milliseconds).
    #[must_use]
    pub fn duration_parts(&self) -> (u32, u32, u32, u32) {
        let total_ms = self.duration_ms;
        let ms = total_ms % 1000;
        let total_seconds = total_ms / 1000;
        let seconds = total_seconds % 60;
        let total_minutes = total_seconds / 60;
        let minutes = total_minutes % 60;
        let hours = total_minutes / 60;

        (hours, minutes, seconds, ms)
    }

    /// Returns the duration formatted as "HH:MM:SS".
    #[must_use]
    pub fn duration_string(&self) -> String {
        let (hours, minutes, seconds, _) = self.duration_parts();
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
