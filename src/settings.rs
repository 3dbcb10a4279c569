//! Decoding of the obfuscated game-settings string.
//!
//! Game options travel inside a lightly masked, null-terminated byte string.
//! The masking keeps every stored byte nonzero so the string survives the
//! container's null-terminator convention: the encoder bumps even bytes by
//! one and records which bytes it touched in a bitmask byte leading every
//! 8-byte group.
//!
//! Unmasking reverses that: input bytes at indices divisible by 8 are mask
//! bytes; for every other input byte at index `i`, mask bit `i % 8` clear
//! means the byte was stored as value + 1 (subtract one to restore), set
//! means it was stored verbatim. Mask bytes are dropped, so the plain
//! buffer is `len - ceil(len / 8)` bytes long.
//!
//! The plain buffer then field-parses into [`GameOptions`]: speed byte, two
//! flag bytes, an extra-flags byte, 9 reserved/checksum bytes, then the map
//! path and creator name as null-terminated strings, closed by a mandatory
//! empty string.

use crate::error::{DecodeError, Result, ResultExt};
use crate::reader::ByteReader;
use crate::replay::GameOptions;
use crate::tables::{GameSpeed, ObserverSetting, Visibility};

/// Reverses the per-group masking of the settings string.
///
/// Deterministic and length-preserving in the sense that the output is
/// always `len - ceil(len / 8)` bytes (the mask bytes are dropped).
#[must_use]
pub fn unmask_settings(encoded: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(encoded.len());
    let mut mask = 0u8;
    for (i, &byte) in encoded.iter().enumerate() {
        if i % 8 == 0 {
            mask = byte;
        } else if mask & (1 << (i % 8)) == 0 {
            decoded.push(byte.wrapping_sub(1));
        } else {
            decoded.push(byte);
        }
    }
    decoded
}

/// Unmasks and field-parses the settings string into [`GameOptions`].
///
/// The game name is carried outside the settings string and is left empty
/// here; the record stream decoder fills it in.
///
/// # Errors
///
/// - `DecodeError::UnexpectedEof` if the plain buffer is shorter than the
///   fixed field layout requires
/// - `DecodeError::InvalidRecord` if the final sanity string is not empty
pub fn decode_settings(encoded: &[u8]) -> Result<GameOptions> {
    let plain = unmask_settings(encoded);
    let mut r = ByteReader::new(&plain);
    let mut options = GameOptions::default();

    options.speed = GameSpeed::from_byte(r.read_u8().context("game speed")?);

    let flags = r.read_u8().context("game settings flags")?;
    let visibility_bits = flags & 0b1111;
    // The visibility nibble is one-hot; counting its leading zeros and
    // subtracting 4 recovers the setting index. An all-zero nibble derives
    // to 4, which stays an unmapped value.
    options.visibility =
        Visibility::from_raw((visibility_bits.leading_zeros() as u8).wrapping_sub(4));
    options.observers = ObserverSetting::from_bits((flags >> 4) & 0b11);
    options.teams_together = (flags >> 6) & 1 == 1;

    let team_flags = r.read_u8().context("team settings flags")? >> 1;
    options.lock_teams = team_flags & 0b11 == 0b11;

    let extra_flags = r.read_u8().context("extra settings flags")?;
    options.shared_unit_control = extra_flags & 1 == 1;
    options.random_hero = (extra_flags >> 1) & 1 == 1;
    options.random_races = (extra_flags >> 2) & 1 == 1;
    if (extra_flags >> 6) & 1 == 1 {
        options.observers = ObserverSetting::Referees;
    }

    // 5 unknown bytes and the 4-byte map checksum
    r.skip(9).context("reserved settings bytes")?;

    let map_name = r.read_cstring().context("map name")?;
    options.map_name = map_name.replace('\\', "/");
    options.creator_name = r.read_cstring().context("game creator name")?;

    let tail = r.read_cstring().context("settings terminator")?;
    if !tail.is_empty() {
        return Err(DecodeError::invalid_record(format!(
            "third decoded string should have been empty: '{tail}'"
        )));
    }

    Ok(options)
}

/// Inverse of `unmask_settings`, for synthesizing fixtures: even bytes are
/// stored bumped by one with their mask bit clear, odd bytes verbatim with
/// the bit set. Every stored byte ends up nonzero, so the result survives
/// null-terminated framing.
#[cfg(test)]
pub(crate) fn mask_settings(plain: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::new();
    for chunk in plain.chunks(7) {
        let mut mask = 1u8;
        for (j, &byte) in chunk.iter().enumerate() {
            if byte % 2 == 1 {
                mask |= 1 << (j + 1);
            }
        }
        encoded.push(mask);
        for &byte in chunk {
            if byte % 2 == 1 {
                encoded.push(byte);
            } else {
                encoded.push(byte + 1);
            }
        }
    }
    encoded
}
