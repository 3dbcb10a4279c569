//! The decoded replay model.
//!
//! [`Replay`] is the aggregate root produced by one decode call. It owns all
//! child collections (slots, players, chat, actions) and is immutable once
//! returned. Players and slots cross-reference each other through plain
//! integer ids resolved via the `Replay`, never through owning pointers, so
//! the model is cycle-free and trivially serializable by callers.

use std::collections::BTreeMap;
use std::io::Read;

use crate::actions::Ability;
use crate::decompress::decompress_blocks;
use crate::error::Result;
use crate::header::Header;
use crate::reader::ByteReader;
use crate::records;
use crate::tables::{
    AiStrength, Color, Expansion, GameSpeed, GameType, ObserverSetting, Race, SlotStatus,
    Visibility,
};

/// A fully decoded replay.
///
/// # Example
///
/// ```no_run
/// use w3g_replay::Replay;
///
/// let data = std::fs::read("match.w3g").unwrap();
/// let replay = Replay::parse(&data).unwrap();
///
/// println!("{} on {}", replay.options.game_name, replay.options.map_name);
/// for player in replay.players.values() {
///     println!("  {}", player.display_name());
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    /// Game duration in milliseconds, from the header.
    pub duration_ms: u32,

    /// Numeric game version, from the header.
    pub version: u32,

    /// Build number of the recording client.
    pub build_number: u16,

    /// Which release recorded the replay.
    pub expansion: Expansion,

    /// Whether the header flagged a multiplayer game.
    pub is_multiplayer: bool,

    /// Game type byte, mapped where known.
    pub game_type: GameType,

    /// Whether the privacy flag marked the game private (0x08 or 0xC8).
    /// Values 0x20 and 0x40 appear in newer builds with unclear meaning
    /// and are not mapped.
    pub private_game: bool,

    /// Decoded game options from the obfuscated settings string.
    pub options: GameOptions,

    /// Lobby seats in slot-id order (index equals slot id).
    pub slots: Vec<Slot>,

    /// Players keyed by their id.
    pub players: BTreeMap<u8, Player>,

    /// Random seed recorded at game start.
    pub random_seed: u32,

    /// Select-mode byte from the game start record. Semantics are only
    /// partially known (0x00 team/race selectable, 0x01 team fixed, 0x03
    /// team and race fixed, 0x04 race random, 0xCC automated matchmaking).
    pub select_mode: u8,

    /// Number of start spots on the map.
    pub start_spot_count: u8,

    /// Chat messages in stream order.
    pub chat: Vec<ChatMessage>,

    /// Decoded player actions in stream order.
    pub actions: Vec<Action>,

    /// Inferred winning team, if any leave event was conclusive.
    pub winner: Option<Winner>,

    /// Id of the player who stayed until the replay's local save point
    /// (the last to disconnect), once all leave events were seen.
    pub saver: Option<u8>,
}

impl Replay {
    /// Decodes a replay from the raw bytes of a `.w3g` file.
    ///
    /// # Errors
    ///
    /// Returns the first structural inconsistency encountered; no partially
    /// decoded replay is ever returned.
    pub fn parse(data: &[u8]) -> Result<Replay> {
        let mut r = ByteReader::new(data);
        let header = Header::decode(&mut r)?;
        let body = decompress_blocks(&mut r, header.block_count, header.uses_new_block_format())?;
        records::decode_body(&body, &header)
    }

    /// Reads a source to its end and decodes it as a replay.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the source, then behaves like
    /// [`parse`](Replay::parse).
    pub fn from_reader(mut source: impl Read) -> Result<Replay> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Replay::parse(&data)
    }

    /// Looks up a player by id.
    #[must_use]
    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Looks up a slot by id.
    #[must_use]
    pub fn slot(&self, id: usize) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Resolves the slot a player occupies.
    #[must_use]
    pub fn slot_of(&self, player: &Player) -> Option<&Slot> {
        self.slots.get(player.slot_id)
    }

    /// Resolves the player occupying a slot, if any.
    #[must_use]
    pub fn occupant(&self, slot: &Slot) -> Option<&Player> {
        if slot.player_id == 0 {
            None
        } else {
            self.players.get(&slot.player_id)
        }
    }

    /// The text shown in-game as the name of a slot: "Open", "Closed",
    /// "Computer (Easy)", or the occupying player's name.
    #[must_use]
    pub fn slot_label(&self, slot: &Slot) -> String {
        match slot.status {
            SlotStatus::Empty => "Open".to_string(),
            SlotStatus::Closed => "Closed".to_string(),
            SlotStatus::Used => {
                if slot.is_cpu {
                    format!("Computer ({})", slot.ai_strength.name())
                } else {
                    self.occupant(slot)
                        .map(|p| p.display_name().to_string())
                        .unwrap_or_default()
                }
            }
        }
    }

    /// Returns the duration formatted as "HH:MM:SS".
    #[must_use]
    pub fn duration_string(&self) -> String {
        let total_seconds = self.duration_ms / 1000;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Game options recovered from the obfuscated settings string, plus the
/// game name carried alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameOptions {
    /// Lobby name of the game.
    pub game_name: String,

    /// Map path with separators normalized to forward slashes.
    pub map_name: String,

    /// Name of the player or service that created the game.
    pub creator_name: String,

    /// Game speed.
    pub speed: GameSpeed,

    /// Map visibility.
    pub visibility: Visibility,

    /// Observer setting.
    pub observers: ObserverSetting,

    /// "Teams together" option.
    pub teams_together: bool,

    /// "Lock teams" option.
    pub lock_teams: bool,

    /// "Full shared unit control" option.
    pub shared_unit_control: bool,

    /// "Random hero" option.
    pub random_hero: bool,

    /// "Random races" option.
    pub random_races: bool,
}

/// A participant with a player record in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Player id, unique within the replay and never zero.
    pub id: u8,

    /// Display name from the player record.
    pub name: String,

    /// Id of the slot this player occupies.
    pub slot_id: usize,

    /// Battle.net account data, when the replay carries it.
    pub battle_net: Option<BattleNetAccount>,

    /// Runtime of the player's game client in milliseconds. Ladder games
    /// only; zero otherwise.
    pub runtime_ms: u32,

    /// Race flags from the ladder player record; zero otherwise.
    pub race_flags: u32,

    /// Game-clock time of this player's leave event, if one was seen.
    pub leave_time_ms: u32,
}

impl Player {
    /// The battle.net username when present, otherwise the record name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.battle_net {
            Some(account) if !account.username.is_empty() => &account.username,
            _ => &self.name,
        }
    }
}

/// Battle.net account data attached to a player.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BattleNetAccount {
    /// Id of the player record this account belongs to.
    pub player_id: u8,

    /// Account name, e.g. "Grubby#1278".
    pub username: String,

    /// Avatar code. Defaults to "p003" (the in-game peon default) when the
    /// block does not carry one.
    pub avatar: String,

    /// Clan tag.
    pub clan: String,

    /// Trailing account bytes with unknown meaning, kept raw.
    pub extra: Vec<u8>,
}

/// One lobby seat from the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Slot id; equals this slot's index in [`Replay::slots`].
    pub id: usize,

    /// Id of the occupying player, or 0 for empty and computer slots.
    pub player_id: u8,

    /// Occupancy status.
    pub status: SlotStatus,

    /// Whether a computer occupies the seat.
    pub is_cpu: bool,

    /// Selected race.
    pub race: Race,

    /// Whether the race byte carried the "selectable or fixed" bit.
    pub race_fixed: bool,

    /// Team number, 1-indexed.
    pub team: u8,

    /// Player color from the palette.
    pub color: Color,

    /// Computer difficulty; meaningful only for CPU slots.
    pub ai_strength: AiStrength,

    /// Handicap percentage (50-100). Zero on versions that predate the
    /// field.
    pub handicap: u8,

    /// Map download percentage; the container only ever stores 100 or 255.
    pub map_download_percent: u8,
}

impl Slot {
    /// Whether a player record occupies this slot.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.player_id != 0
    }
}

/// The inferred outcome of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The given team (1-indexed) won.
    Team(u8),

    /// The game ended in a draw.
    Draw,
}

/// One chat message from the replay stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Game-clock timestamp in milliseconds from game start.
    pub time_ms: u32,

    /// Slot id of the authoring player.
    pub author_slot: usize,

    /// Message text.
    pub body: String,

    /// Who the message was addressed to.
    pub target: MessageTarget,
}

/// Chat destination variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    /// No destination was recorded (lobby-style messages).
    Unspecified,

    /// Everyone in the game.
    Everyone,

    /// The author's allies.
    Allies,

    /// The observers.
    Observers,

    /// A single player, addressed by slot id.
    Slot(usize),
}

/// One player-issued command with its game-clock timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Game-clock timestamp in milliseconds from game start.
    pub time_ms: u32,

    /// Id of the acting player.
    pub player_id: u8,

    /// The decoded ability payload.
    pub ability: Ability,
}
