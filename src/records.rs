//! The record-stream decoder for decompressed replay bodies.
//!
//! After decompression the body is one long record stream:
//!
//! 1. a reserved 32-bit field, then the host's player record
//! 2. game name, an occasionally-present mystery string, and the
//!    obfuscated settings string
//! 3. a short run of scalar fields (player count, game type, privacy flag,
//!    language id)
//! 4. a tagged record list: more player records (0x16), an optional
//!    battle.net data block (0x39), closed by 0x19
//! 5. the game start record with the slot table
//! 6. random seed, select mode, start spot count
//! 7. replay-data blocks until the end of the stream: time slots carrying
//!    nested action buffers, chat messages, leave events feeding winner
//!    deduction, and a handful of fixed-size bookkeeping blocks
//!
//! Decoding is strict about structure it understands (bad tags, lookup
//! misses, and identity inconsistencies are fatal) and tolerant about
//! structure it does not: unknown trailing block ids end the stream, and
//! unrecognized advisory bytes are logged, not raised.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::actions;
use crate::error::{DecodeError, Result, ResultExt};
use crate::header::Header;
use crate::outcome::{LeaveEvent, OutcomeTracker};
use crate::reader::ByteReader;
use crate::replay::{
    Action, BattleNetAccount, ChatMessage, MessageTarget, Player, Replay, Slot,
};
use crate::settings;
use crate::tables::{self, AiStrength, GameType, Race, SlotStatus};

/// Record tag introducing an additional player record.
const PLAYER_RECORD_TAG: u8 = 0x16;

/// Record tag introducing the battle.net data block.
const BATTLE_NET_TAG: u8 = 0x39;

/// Record tag closing the pre-game record list.
const RECORD_LIST_END_TAG: u8 = 0x19;

/// Envelope byte wrapping battle.net account entries from online games.
const ACCOUNT_ENVELOPE_TAG: u8 = 0x0A;

/// Avatar code used when a battle.net account block carries none (the
/// in-game default is the peon).
pub const DEFAULT_AVATAR: &str = "p003";

/// First version whose slot records carry an AI-strength byte.
pub const AI_STRENGTH_VERSION: u32 = 3;

/// First version whose slot records carry a handicap byte.
pub const HANDICAP_VERSION: u32 = 7;

/// Versions below this read block id 0x22 as 0x20 on the wire.
const CHECKSUM_ALIAS_VERSION: u32 = 3;

// replay-data block ids
const BLOCK_LEAVE: u8 = 0x17;
const BLOCK_TIME_SLOT_A: u8 = 0x1E;
const BLOCK_TIME_SLOT_B: u8 = 0x1F;
const BLOCK_CHAT: u8 = 0x20;
const BLOCK_CHECKSUM: u8 = 0x22;
const BLOCK_FORCED_END: u8 = 0x2F;

/// Everything learned about a player before the model is assembled.
///
/// Player records are the first thing the stream says about a player; the
/// slot table and the battle.net block attach to them afterwards.
#[derive(Debug, Default)]
struct PlayerRecordData {
    id: u8,
    name: String,
    runtime_ms: u32,
    race_flags: u32,
    battle_net: Option<BattleNetAccount>,
    slot_id: Option<usize>,
}

/// Decodes the decompressed body into a [`Replay`].
///
/// # Errors
///
/// Any structural failure, wrapped with the approximate offset into the
/// decompressed stream at which decoding stopped.
pub fn decode_body(body: &[u8], header: &Header) -> Result<Replay> {
    let mut r = ByteReader::new(body);
    decode_records(&mut r, header).map_err(|e| e.at_offset(r.position()))
}

fn decode_records(r: &mut ByteReader<'_>, header: &Header) -> Result<Replay> {
    r.read_u32_le().context("reserved field")?;

    let mut records: BTreeMap<u8, PlayerRecordData> = BTreeMap::new();

    r.expect_u8(0).context("host record marker")?;
    let host = read_player_record(r)?;
    records.insert(host.id, host);

    let game_name = r.read_cstring().context("game name")?;

    // a lone null byte usually follows the game name, but it can also be
    // the first character of a second string
    if r.is_empty() {
        return Err(
            DecodeError::unexpected_eof(r.position() + 1, r.position()).context("mystery string"),
        );
    }
    if r.peek_u8() == Some(0) {
        r.skip(1)?;
    } else {
        let mystery = r.read_cstring().context("mystery string")?;
        debug!("mystery string after game name: {mystery:?}");
    }

    let encoded = r.read_cstring_bytes().context("encoded settings string")?;
    let mut options = settings::decode_settings(encoded).context("decoded settings string")?;
    options.game_name = game_name;

    r.read_u32_le().context("player count")?;

    let game_type = GameType::from_byte(r.read_u8().context("game type")?);

    let private_flag = r.read_u8().context("private flag")?;
    let private_game = private_flag == 0x08 || private_flag == 0xC8;
    // TODO: 0x20 (public custom game) and 0x40 (matchmaking) show up in
    // newer builds; their exact meaning is unconfirmed so they stay unmapped

    match r.expect_u16_le(0) {
        Ok(()) => {}
        Err(DecodeError::ValueMismatch { actual, .. }) => {
            debug!("nonzero sanity word after game type: 0x{actual:X}");
        }
        Err(e) => return Err(e.context("sanity word")),
    }

    r.read_u32_le().context("language id")?;

    loop {
        let tag = r.read_u8().context("record tag")?;
        match tag {
            PLAYER_RECORD_TAG => {
                let record = read_player_record(r)?;
                records.insert(record.id, record);
                r.read_u32_le().context("player record tail")?;
            }
            BATTLE_NET_TAG => read_battle_net_section(r, &mut records)?,
            RECORD_LIST_END_TAG => break,
            other => {
                return Err(DecodeError::invalid_record(format!(
                    "unexpected record tag 0x{other:02X}"
                )));
            }
        }
    }

    // game start record
    r.read_u16_le().context("game start record size")?;
    let slot_count = r.read_u8().context("slot count")?;
    let mut slots = Vec::with_capacity(slot_count as usize);
    for slot_id in 0..slot_count as usize {
        slots.push(read_slot_record(r, header.version, slot_id, &mut records)?);
    }

    let mut players: BTreeMap<u8, Player> = BTreeMap::new();
    for (id, record) in records {
        let slot_id = record.slot_id.ok_or_else(|| {
            DecodeError::invalid_record(format!(
                "inconsistent identity: player {id} has no slot in the slot table"
            ))
        })?;
        if slots[slot_id].player_id != id {
            return Err(DecodeError::invalid_record(format!(
                "inconsistent identity: player {id} and slot {slot_id} do not reference each other"
            )));
        }
        players.insert(
            id,
            Player {
                id,
                name: record.name,
                slot_id,
                battle_net: record.battle_net,
                runtime_ms: record.runtime_ms,
                race_flags: record.race_flags,
                leave_time_ms: 0,
            },
        );
    }

    // the reverse direction: every occupied slot resolves to a player
    // whose slot id points back at it
    for slot in &slots {
        if slot.player_id == 0 {
            continue;
        }
        match players.get(&slot.player_id) {
            Some(player) if player.slot_id == slot.id => {}
            _ => {
                return Err(DecodeError::invalid_record(format!(
                    "inconsistent identity: slot {} occupant {} does not resolve back",
                    slot.id, slot.player_id
                )));
            }
        }
    }

    let random_seed = r.read_u32_le().context("random seed")?;
    let select_mode = r.read_u8().context("select mode")?;
    let start_spot_count = r.read_u8().context("start spot count")?;

    // replay-data blocks
    let mut clock_ms: u32 = 0;
    let mut pending_zeroes = 0usize;
    let mut outcome = OutcomeTracker::new();
    let mut chat = Vec::new();
    let mut action_log: Vec<Action> = Vec::new();

    loop {
        if r.is_empty() {
            break;
        }
        let mut tag = r.read_u8().context("block id")?;
        if header.version < CHECKSUM_ALIAS_VERSION && tag == 0x20 {
            // before 1.03, 0x20 carried what later became the 0x22 block
            tag = BLOCK_CHECKSUM;
        }

        match tag {
            0x00 => pending_zeroes += 1,
            BLOCK_LEAVE => {
                let event = LeaveEvent {
                    reason: r.read_u32_le().context("leave reason")?,
                    player_id: r.read_u8().context("leave player id")?,
                    result: r.read_u32_le().context("leave result")?,
                    unknown: r.read_u32_le().context("leave unknown value")?,
                };
                let total_players = players.len();
                let player = players.get_mut(&event.player_id).ok_or_else(|| {
                    DecodeError::invalid_record(format!(
                        "leave event references unknown player: id={}",
                        event.player_id
                    ))
                })?;
                player.leave_time_ms = clock_ms;
                let team = slots[player.slot_id].team;
                outcome.record_leave(&event, team, total_players);
            }
            0x1A | 0x1B | 0x1C => r.expect_u32_le(1).context("start block")?,
            BLOCK_TIME_SLOT_A | BLOCK_TIME_SLOT_B => {
                let block_len = r.read_u16_le().context("time slot length")?;
                let increment = r.read_u16_le().context("time slot increment")?;
                clock_ms += u32::from(increment);
                if block_len > 2 {
                    let command_data =
                        r.read_bytes(block_len as usize - 2).context("command data")?;
                    decode_command_data(command_data, header.version, clock_ms, &mut action_log)?;
                }
            }
            BLOCK_CHAT => chat.push(read_chat_message(r, clock_ms, &players)?),
            BLOCK_CHECKSUM => {
                let len = r.read_u8().context("checksum length")?;
                r.skip(len as usize).context("checksum block")?;
            }
            0x23 => r.skip(10).context("block 0x23")?,
            BLOCK_FORCED_END => {
                let mode = r.read_u32_le().context("forced end mode")?;
                let seconds = r.read_u32_le().context("forced end seconds")?;
                debug!("forced game end countdown: mode 0x{mode:X}, {seconds}s");
            }
            other => {
                // unknown trailing structure is tolerated, not fatal
                debug!("unknown replay data block id 0x{other:02X}, stopping");
                break;
            }
        }

        if tag != 0 && pending_zeroes > 0 {
            debug!("{pending_zeroes} zero-padding bytes inside replay data");
            pending_zeroes = 0;
        }
    }

    Ok(Replay {
        duration_ms: header.duration_ms,
        version: header.version,
        build_number: header.build_number,
        expansion: header.expansion,
        is_multiplayer: header.is_multiplayer,
        game_type,
        private_game,
        options,
        slots,
        players,
        random_seed,
        select_mode,
        start_spot_count,
        chat,
        actions: action_log,
        winner: outcome.winner(),
        saver: outcome.saver(),
    })
}

/// Reads one player record (without its surrounding tag bytes).
fn read_player_record(r: &mut ByteReader<'_>) -> Result<PlayerRecordData> {
    let id = r.read_u8().context("player id")?;
    let name = r.read_cstring().context("player name")?;
    let mut record = PlayerRecordData {
        id,
        name,
        ..PlayerRecordData::default()
    };

    let additional = r.read_u8().context("player additional data size")?;
    match additional {
        0x00 => {}
        0x01 => r.expect_u8(0).context("player record padding")?,
        0x08 => {
            // ladder games only
            record.runtime_ms = r.read_u32_le().context("player exe runtime")?;
            record.race_flags = r.read_u32_le().context("player race flags")?;
        }
        other => {
            warn!("unrecognized player additional data size: 0x{other:02X}");
            r.skip(other as usize).context("player additional data")?;
        }
    }
    Ok(record)
}

/// Reads one slot record and back-links it to its player record.
fn read_slot_record(
    r: &mut ByteReader<'_>,
    version: u32,
    slot_id: usize,
    records: &mut BTreeMap<u8, PlayerRecordData>,
) -> Result<Slot> {
    let player_id = r.read_u8().context("slot player id")?;
    // player id 0 marks an unoccupied or computer slot
    if player_id != 0 {
        let record = records.get_mut(&player_id).ok_or_else(|| {
            DecodeError::invalid_record(format!(
                "slot {slot_id} references invalid player record: id={player_id}"
            ))
        })?;
        record.slot_id = Some(slot_id);
    }

    let map_download_percent = r.read_u8().context("map download percent")?;
    if map_download_percent != 100 && map_download_percent != 255 {
        // possibly over-strict for partially downloaded maps, kept strict
        return Err(DecodeError::invalid_record(format!(
            "sanity check failed: map download percent 0x{map_download_percent:02X} in slot {slot_id}"
        )));
    }

    let status_byte = r.read_u8().context("slot status")?;
    let status = SlotStatus::from_byte(status_byte).ok_or_else(|| {
        DecodeError::invalid_record(format!("invalid slot status: 0x{status_byte:02X}"))
    })?;

    let is_cpu = r.read_u8().context("cpu flag")? == 1;

    let team_raw = r.read_u8().context("team number")?;
    // teams are 1-indexed in the model
    let team = team_raw.checked_add(1).ok_or_else(|| {
        DecodeError::invalid_record(format!("team number out of range: {team_raw}"))
    })?;

    let color_byte = r.read_u8().context("color")?;
    let color = tables::color_from_index(color_byte).ok_or_else(|| {
        DecodeError::invalid_record(format!(
            "color index outside palette: 0x{color_byte:02X}"
        ))
    })?;

    let mut race_byte = r.read_u8().context("race")?;
    let race_fixed = race_byte & 0x40 != 0;
    if race_fixed {
        race_byte &= !0x40;
    }
    let race = Race::from_byte(race_byte)
        .ok_or_else(|| DecodeError::invalid_record(format!("unknown race: 0x{race_byte:02X}")))?;

    let ai_strength = if version >= AI_STRENGTH_VERSION {
        AiStrength::from_byte(r.read_u8().context("ai strength")?)
    } else {
        AiStrength::Normal
    };

    let handicap = if version >= HANDICAP_VERSION {
        r.read_u8().context("handicap")?
    } else {
        0
    };

    Ok(Slot {
        id: slot_id,
        player_id,
        status,
        is_cpu,
        race,
        race_fixed,
        team,
        color,
        ai_strength,
        handicap,
        map_download_percent,
    })
}

/// Decodes the battle.net data block following a 0x39 tag.
fn read_battle_net_section(
    r: &mut ByteReader<'_>,
    records: &mut BTreeMap<u8, PlayerRecordData>,
) -> Result<()> {
    let kind = r.read_u8().context("battle.net section kind")?;
    match kind {
        0x04 | 0x05 => {
            // opaque bonus data; length-prefixed and skipped
            let len = r.read_u32_le().context("battle.net bonus data length")?;
            r.skip(len as usize).context("battle.net bonus data")?;
        }
        0x03 => {
            let len = r.read_u32_le().context("battle.net block length")?;
            let block = r.read_bytes(len as usize).context("battle.net block")?;
            let mut entries = ByteReader::new(block);
            // the entry count is not stored; consume until the block is
            // exhausted
            while !entries.is_empty() {
                // online entries arrive in an 0x0A envelope, LAN entries
                // do not
                let account = if entries.peek_u8() == Some(ACCOUNT_ENVELOPE_TAG) {
                    read_enveloped_account(&mut entries)?
                } else {
                    read_account_fields(&mut entries)?
                };
                let record = records.get_mut(&account.player_id).ok_or_else(|| {
                    DecodeError::invalid_record(format!(
                        "battle.net account refers to nonexistent player record: {}",
                        account.player_id
                    ))
                })?;
                record.battle_net = Some(account);
            }
        }
        other => {
            return Err(DecodeError::invalid_record(format!(
                "unexpected battle.net section kind: 0x{other:02X}"
            )));
        }
    }
    Ok(())
}

/// Unwraps an 0x0A-enveloped account entry and decodes its fields.
fn read_enveloped_account(r: &mut ByteReader<'_>) -> Result<BattleNetAccount> {
    r.expect_u8(ACCOUNT_ENVELOPE_TAG)
        .context("battle.net account envelope")?;
    let len = r.read_u8().context("battle.net account length")?;
    let block = r.read_bytes(len as usize).context("battle.net account")?;
    read_account_fields(&mut ByteReader::new(block))
}

/// Decodes the tag-value fields of one battle.net account entry.
fn read_account_fields(r: &mut ByteReader<'_>) -> Result<BattleNetAccount> {
    let mut account = BattleNetAccount::default();
    while !r.is_empty() {
        let section = r.read_u8().context("battle.net account section")?;
        match section {
            0x08 => account.player_id = r.read_u8().context("battle.net player id")?,
            0x12 => {
                account.username = r
                    .read_length_prefixed_string()
                    .context("battle.net username")?;
            }
            0x22 => {
                account.avatar = r
                    .read_length_prefixed_string()
                    .context("battle.net avatar")?;
            }
            0x1A => {
                account.clan = r.read_length_prefixed_string().context("battle.net clan")?;
            }
            0x28 => {
                let rest = r.remaining();
                account.extra = r.read_bytes(rest)?.to_vec();
            }
            other => warn!("unrecognized battle.net account section: 0x{other:02X}"),
        }
    }
    if account.avatar.is_empty() {
        account.avatar = DEFAULT_AVATAR.to_string();
    }
    Ok(account)
}

/// Walks a time slot's command buffer, decoding nested action blocks.
fn decode_command_data(
    command_data: &[u8],
    version: u32,
    clock_ms: u32,
    action_log: &mut Vec<Action>,
) -> Result<()> {
    let mut commands = ByteReader::new(command_data);
    while !commands.is_empty() {
        let player_id = commands.read_u8().context("command player id")?;
        let action_len = commands.read_u16_le().context("action block length")?;
        let action_data = commands
            .read_bytes(action_len as usize)
            .context("action block")?;
        let mut abilities = ByteReader::new(action_data);
        while !abilities.is_empty() {
            match actions::decode_ability(&mut abilities, version)? {
                Some(ability) => action_log.push(Action {
                    time_ms: clock_ms,
                    player_id,
                    ability,
                }),
                // unknown opcode: give up on the rest of this buffer
                None => break,
            }
        }
    }
    Ok(())
}

/// Decodes one chat message block.
fn read_chat_message(
    r: &mut ByteReader<'_>,
    clock_ms: u32,
    players: &BTreeMap<u8, Player>,
) -> Result<ChatMessage> {
    let author_id = r.read_u8().context("chat player id")?;
    r.read_u16_le().context("chat block length")?;
    let flags = r.read_u8().context("chat flags")?;

    let target = if flags == 0x10 {
        MessageTarget::Unspecified
    } else {
        let mode = r.read_u32_le().context("chat mode")?;
        match mode {
            0x00 => MessageTarget::Everyone,
            0x01 => MessageTarget::Allies,
            0x02 => MessageTarget::Observers,
            other => {
                // direct message: the mode encodes the recipient player id
                let target_id = u8::try_from(other - 2).map_err(|_| {
                    DecodeError::invalid_record(format!(
                        "chat target out of range: mode 0x{other:X}"
                    ))
                })?;
                let target_player = players.get(&target_id).ok_or_else(|| {
                    DecodeError::invalid_record(format!(
                        "chat target references unknown player: id={target_id}"
                    ))
                })?;
                MessageTarget::Slot(target_player.slot_id)
            }
        }
    };

    let body = r.read_cstring().context("chat body")?;
    let author = players.get(&author_id).ok_or_else(|| {
        DecodeError::invalid_record(format!(
            "chat author references unknown player: id={author_id}"
        ))
    })?;

    Ok(ChatMessage {
        time_ms: clock_ms,
        author_slot: author.slot_id,
        body,
        target,
    })
}
