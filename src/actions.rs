//! Decoding of player-issued ability commands.
//!
//! Action blocks open with an opcode byte. Opcodes 0x10 through 0x14 are
//! ability commands sharing a common prefix and adding targets as the
//! opcode grows:
//!
//! | Opcode | Shape |
//! |--------|-------|
//! | 0x10 | ability with no target |
//! | 0x11 | + target point |
//! | 0x12 | + two target object ids |
//! | 0x13 | + two item object ids (give or drop item) |
//! | 0x14 | second item id and second target point instead of object ids |
//!
//! The prefix is version-gated twice: the ability-flags field widens from
//! one byte to two exactly at version 13, and two reserved 32-bit fields
//! appear from version 7 on. Target points are 32-bit floats from version 7
//! and plain 32-bit integers in older builds.
//!
//! Opcodes outside 0x10-0x14 yield no action rather than an error; the
//! caller abandons the rest of that action buffer, mirroring the decoder's
//! overall tolerance for unknown trailing structure.

use std::fmt;

use crate::error::Result;
use crate::reader::ByteReader;

/// First version whose ability-flags field is two bytes wide.
pub const WIDE_ABILITY_FLAGS_VERSION: u32 = 13;

/// First version carrying the two reserved 32-bit ability fields and
/// float-encoded target points.
pub const EXTENDED_ABILITY_VERSION: u32 = 7;

/// A 4-byte item/ability identifier.
///
/// Identifiers are either printable 4-character codes stored byte-reversed
/// ("hpea" for a peasant) or raw binary ids containing zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemId(pub [u8; 4]);

impl ItemId {
    /// The printable 4-character code, when the id is one.
    ///
    /// Returns `None` for binary ids (those containing zero bytes).
    #[must_use]
    pub fn code(&self) -> Option<String> {
        if self.0.contains(&0) {
            return None;
        }
        let reversed: Vec<u8> = self.0.iter().rev().copied().collect();
        String::from_utf8(reversed).ok()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => f.write_str(&code),
            None => {
                let [a, b, c, d] = self.0;
                write!(f, "{a:02X} {b:02X} {c:02X} {d:02X}")
            }
        }
    }
}

/// A 32-bit object handle; the all-ones value addresses the ground rather
/// than a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectId(pub u32);

impl ObjectId {
    /// Whether this id addresses the ground.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.0 == 0xFFFF_FFFF
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            f.write_str("the ground")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A target point in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1},{:.1})", self.x, self.y)
    }
}

/// Fields shared by every ability shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityBase {
    /// Modifier flags (queue, group, autocast, ...).
    pub flags: u16,

    /// The issued item or ability id.
    pub item_id: ItemId,
}

/// A decoded ability command, one variant per wire shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ability {
    /// Opcode 0x10: an ability with no target.
    Plain(AbilityBase),

    /// Opcode 0x11: an ability aimed at a point.
    Targeted {
        /// Shared prefix fields.
        base: AbilityBase,
        /// Where the ability was aimed.
        target: Point,
    },

    /// Opcode 0x12: an ability aimed at an object (or the ground).
    ObjectTargeted {
        /// Shared prefix fields.
        base: AbilityBase,
        /// Where the ability was aimed.
        target: Point,
        /// The two object-id halves of the target.
        objects: (ObjectId, ObjectId),
    },

    /// Opcode 0x13: give an item to a unit, or drop it on the ground.
    GiveOrDropItem {
        /// Shared prefix fields.
        base: AbilityBase,
        /// Where the ability was aimed.
        target: Point,
        /// The receiving object, or the ground when dropping.
        objects: (ObjectId, ObjectId),
        /// The item being moved, as a pair of object ids.
        item_objects: (ObjectId, ObjectId),
    },

    /// Opcode 0x14: an ability with two item ids and two target points.
    DualTarget {
        /// Shared prefix fields.
        base: AbilityBase,
        /// First target point.
        target: Point,
        /// Second item id.
        second_item: ItemId,
        /// Second target point.
        second_target: Point,
    },
}

impl Ability {
    /// The prefix fields common to every shape.
    #[must_use]
    pub fn base(&self) -> &AbilityBase {
        match self {
            Ability::Plain(base) => base,
            Ability::Targeted { base, .. }
            | Ability::ObjectTargeted { base, .. }
            | Ability::GiveOrDropItem { base, .. }
            | Ability::DualTarget { base, .. } => base,
        }
    }

    /// Whether an object-targeted shape addresses the ground with both
    /// object ids. Always false for the other shapes.
    #[must_use]
    pub fn targets_ground(&self) -> bool {
        match self {
            Ability::ObjectTargeted { objects, .. }
            | Ability::GiveOrDropItem { objects, .. } => {
                objects.0.is_ground() && objects.1.is_ground()
            }
            _ => false,
        }
    }

    /// Whether this is an item drop (a give-or-drop aimed at the ground).
    #[must_use]
    pub fn is_item_drop(&self) -> bool {
        matches!(self, Ability::GiveOrDropItem { .. }) && self.targets_ground()
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ability::Plain(base) => {
                write!(f, "Ability [mod {:#04x}] {}", base.flags, base.item_id)
            }
            Ability::Targeted { base, target } => {
                write!(
                    f,
                    "Ability [mod {:#04x}] {} at {target}",
                    base.flags, base.item_id
                )
            }
            Ability::ObjectTargeted {
                base,
                target,
                objects,
            } => write!(
                f,
                "Ability [mod {:#04x}] {} object ({}, {}) at {target}",
                base.flags, base.item_id, objects.0, objects.1
            ),
            Ability::GiveOrDropItem {
                base,
                target,
                objects,
                item_objects,
            } => {
                if self.targets_ground() {
                    write!(
                        f,
                        "Drop item {} ({}, {}) on ground at {target}",
                        base.item_id, item_objects.0, item_objects.1
                    )
                } else {
                    write!(
                        f,
                        "Give item {} ({}, {}) to obj ({}, {}) at {target}",
                        base.item_id, item_objects.0, item_objects.1, objects.0, objects.1
                    )
                }
            }
            Ability::DualTarget {
                base,
                target,
                second_item,
                second_target,
            } => write!(
                f,
                "Ability [mod {:#04x}] {} + {second_item} to {target} & {second_target}",
                base.flags, base.item_id
            ),
        }
    }
}

/// Reads a target point in the representation the version uses.
fn read_point(r: &mut ByteReader<'_>, version: u32) -> Result<Point> {
    if version >= EXTENDED_ABILITY_VERSION {
        let x = r.read_f32_le()?;
        let y = r.read_f32_le()?;
        Ok(Point { x, y })
    } else {
        // reduced builds store plain integers
        let x = r.read_u32_le()? as f32;
        let y = r.read_u32_le()? as f32;
        Ok(Point { x, y })
    }
}

/// Decodes one ability from an action buffer.
///
/// Returns `Ok(None)` for opcodes outside 0x10-0x14; the reader is left
/// wherever decoding stopped and the caller should abandon the remainder of
/// the buffer.
///
/// # Errors
///
/// Returns `DecodeError::UnexpectedEof` if a recognized opcode's fields are
/// truncated.
pub fn decode_ability(r: &mut ByteReader<'_>, version: u32) -> Result<Option<Ability>> {
    let opcode = r.read_u8()?;
    if !(0x10..=0x14).contains(&opcode) {
        return Ok(None);
    }

    let flags = if version < WIDE_ABILITY_FLAGS_VERSION {
        u16::from(r.read_u8()?)
    } else {
        r.read_u16_le()?
    };

    let id = r.read_bytes(4)?;
    let item_id = ItemId([id[0], id[1], id[2], id[3]]);

    if version >= EXTENDED_ABILITY_VERSION {
        // two unknown values, 0xFFFFFFFF in replays before roughly 1.18
        r.read_u32_le()?;
        r.read_u32_le()?;
    }

    let base = AbilityBase { flags, item_id };
    if opcode == 0x10 {
        return Ok(Some(Ability::Plain(base)));
    }

    let target = read_point(r, version)?;
    if opcode == 0x11 {
        return Ok(Some(Ability::Targeted { base, target }));
    }

    if opcode == 0x14 {
        let id2 = r.read_bytes(4)?;
        let second_item = ItemId([id2[0], id2[1], id2[2], id2[3]]);
        r.skip(9)?;
        let second_target = read_point(r, version)?;
        return Ok(Some(Ability::DualTarget {
            base,
            target,
            second_item,
            second_target,
        }));
    }

    let objects = (ObjectId(r.read_u32_le()?), ObjectId(r.read_u32_le()?));
    if opcode == 0x12 {
        return Ok(Some(Ability::ObjectTargeted {
            base,
            target,
            objects,
        }));
    }

    let item_objects = (ObjectId(r.read_u32_le()?), ObjectId(r.read_u32_le()?));
    Ok(Some(Ability::GiveOrDropItem {
        base,
        target,
        objects,
        item_objects,
    }))
}
