//! Static lookup tables and small enumerations for decoded replay fields.
//!
//! The palette, race map, and slot-status map are fixed reference data: they
//! are consulted during slot-table decoding and a byte outside their domain
//! is a fatal format error, never a silent default. The remaining
//! enumerations (`GameSpeed`, `Visibility`, ...) mirror open integer fields
//! in the container, so each carries an `Unknown` variant that preserves
//! unmapped raw values instead of inventing meanings for them.

use std::fmt;

/// A player color from the fixed 24-entry palette.
///
/// Colors are encoded as an index into [`COLORS`] (Red is 0x00, Blue is
/// 0x01, ...). RGBA values are taken from WorldEdit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Display name, e.g. "Teal".
    pub name: &'static str,
    /// RGBA components.
    pub rgba: [u8; 4],
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// All player colors in encoding order.
///
/// Index 12 (Maroon) doubles as the observer/referee color.
pub const COLORS: [Color; 24] = [
    Color { name: "Red", rgba: [255, 4, 2, 255] },
    Color { name: "Blue", rgba: [0, 66, 255, 255] },
    Color { name: "Teal", rgba: [27, 230, 186, 255] },
    Color { name: "Purple", rgba: [85, 0, 129, 255] },
    Color { name: "Yellow", rgba: [255, 252, 0, 255] },
    Color { name: "Orange", rgba: [255, 138, 13, 255] },
    Color { name: "Green", rgba: [32, 191, 0, 255] },
    Color { name: "Pink", rgba: [227, 91, 175, 255] },
    Color { name: "Grey", rgba: [148, 150, 151, 255] },
    Color { name: "LightBlue", rgba: [126, 191, 241, 255] },
    Color { name: "DarkGreen", rgba: [16, 98, 71, 255] },
    Color { name: "Brown", rgba: [79, 43, 5, 255] },
    Color { name: "Maroon", rgba: [156, 0, 0, 255] },
    Color { name: "Navy", rgba: [0, 0, 194, 255] },
    Color { name: "Turquoise", rgba: [0, 235, 255, 255] },
    Color { name: "Violet", rgba: [189, 0, 255, 255] },
    Color { name: "Wheat", rgba: [236, 204, 134, 255] },
    Color { name: "Peach", rgba: [247, 164, 139, 255] },
    Color { name: "Mint", rgba: [191, 255, 128, 255] },
    Color { name: "Lavender", rgba: [219, 184, 236, 255] },
    Color { name: "Coal", rgba: [79, 79, 85, 255] },
    Color { name: "Snow", rgba: [236, 240, 255, 255] },
    Color { name: "Emerald", rgba: [0, 120, 30, 255] },
    Color { name: "Peanut", rgba: [164, 111, 52, 255] },
];

/// Resolves a color byte from a slot record against the palette.
///
/// Returns `None` for indices at or beyond 24; callers treat that as a
/// fatal format error.
#[must_use]
pub fn color_from_index(index: u8) -> Option<Color> {
    COLORS.get(index as usize).copied()
}

/// A playable race, resolved from the slot-record race byte.
///
/// The byte's 0x40 bit ("selectable or fixed") is masked off before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    /// Human Alliance.
    Human,
    /// Orcish Horde.
    Orc,
    /// Night Elf Sentinels.
    NightElf,
    /// Undead Scourge.
    Undead,
    /// Random race.
    Random,
}

impl Race {
    /// Resolves a masked race byte, or `None` for unmapped values.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<Race> {
        match value {
            0x01 => Some(Race::Human),
            0x02 => Some(Race::Orc),
            0x04 => Some(Race::NightElf),
            0x08 => Some(Race::Undead),
            0x20 => Some(Race::Random),
            _ => None,
        }
    }

    /// Display name, e.g. "Night Elf".
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Race::Human => "Human",
            Race::Orc => "Orc",
            Race::NightElf => "Night Elf",
            Race::Undead => "Undead",
            Race::Random => "Random",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Occupancy of a lobby seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Open seat; nobody joined.
    Empty,
    /// Closed by the host.
    Closed,
    /// Occupied by a player or a computer.
    Used,
}

impl SlotStatus {
    /// Resolves a slot-status byte, or `None` for values outside {0, 1, 2}.
    #[must_use]
    pub fn from_byte(value: u8) -> Option<SlotStatus> {
        match value {
            0x00 => Some(SlotStatus::Empty),
            0x01 => Some(SlotStatus::Closed),
            0x02 => Some(SlotStatus::Used),
            _ => None,
        }
    }
}

/// Computer opponent difficulty from the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStrength {
    /// Easy computer.
    Easy,
    /// Normal computer. Human slots also carry this value.
    Normal,
    /// Insane computer.
    Insane,
    /// An AI-strength byte with no known mapping.
    Unknown(u8),
}

impl AiStrength {
    /// Decodes the AI-strength byte.
    #[must_use]
    pub fn from_byte(value: u8) -> AiStrength {
        match value {
            0x00 => AiStrength::Easy,
            0x01 => AiStrength::Normal,
            0x02 => AiStrength::Insane,
            other => AiStrength::Unknown(other),
        }
    }

    /// In-game label for this difficulty.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AiStrength::Easy => "Easy",
            AiStrength::Normal => "Normal",
            AiStrength::Insane => "Insane",
            AiStrength::Unknown(_) => "n/a",
        }
    }
}

/// Game speed setting from the decoded settings string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameSpeed {
    /// Slow.
    #[default]
    Slow,
    /// Normal.
    Normal,
    /// Fast. Standard for multiplayer.
    Fast,
    /// A speed byte with no known mapping.
    Unknown(u8),
}

impl GameSpeed {
    /// Decodes the speed byte.
    #[must_use]
    pub fn from_byte(value: u8) -> GameSpeed {
        match value {
            0 => GameSpeed::Slow,
            1 => GameSpeed::Normal,
            2 => GameSpeed::Fast,
            other => GameSpeed::Unknown(other),
        }
    }
}

/// Map visibility setting from the decoded settings string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Default fog of war.
    #[default]
    Default,
    /// Entire map always visible.
    AlwaysVisible,
    /// Map explored but fogged.
    MapExplored,
    /// Terrain hidden until explored.
    HideTerrain,
    /// A derived visibility value with no known mapping.
    Unknown(u8),
}

impl Visibility {
    /// Maps the derived visibility value (see the settings decoder for how
    /// it is computed from the flag nibble).
    #[must_use]
    pub fn from_raw(value: u8) -> Visibility {
        match value {
            0 => Visibility::Default,
            1 => Visibility::AlwaysVisible,
            2 => Visibility::MapExplored,
            3 => Visibility::HideTerrain,
            other => Visibility::Unknown(other),
        }
    }
}

/// Observer setting from the decoded settings string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverSetting {
    /// No observers.
    #[default]
    Off,
    /// Observers on defeat.
    OnDefeat,
    /// Full observers.
    On,
    /// Referees. Set by its own flag bit, overriding the two-bit field.
    Referees,
    /// An observer field value with no known mapping.
    Unknown(u8),
}

impl ObserverSetting {
    /// Maps the two-bit observer field.
    #[must_use]
    pub fn from_bits(value: u8) -> ObserverSetting {
        match value {
            0 => ObserverSetting::Off,
            2 => ObserverSetting::OnDefeat,
            3 => ObserverSetting::On,
            other => ObserverSetting::Unknown(other),
        }
    }
}

/// Game type byte from the record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameType {
    /// Value 0x00; seen but unmapped.
    #[default]
    Unknown,
    /// Free-for-all or 1on1 ladder.
    FfaOrOneOnOne,
    /// Custom game.
    Custom,
    /// Local single-player game.
    Singleplayer,
    /// Ladder team game (AT or RT, 2on2/3on3/4on4).
    LadderTeam,
    /// Any other value, preserved raw.
    Other(u8),
}

impl GameType {
    /// Decodes the game-type byte.
    #[must_use]
    pub fn from_byte(value: u8) -> GameType {
        match value {
            0x00 => GameType::Unknown,
            0x01 => GameType::FfaOrOneOnOne,
            0x09 => GameType::Custom,
            0x1D => GameType::Singleplayer,
            0x20 => GameType::LadderTeam,
            other => GameType::Other(other),
        }
    }
}

/// Which release of the game recorded the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    /// Reign of Chaos ("WAR3" tag, and the default when no tag is present).
    #[default]
    ReignOfChaos,
    /// The Frozen Throne ("W3XP" tag).
    TheFrozenThrone,
}
