//! End-to-end decoding tests over synthesized replay containers.
//!
//! Real `.w3g` files are not checked into the repository, so these tests
//! build complete containers in memory: a header, zlib-compressed body
//! blocks, and a record stream with players, a slot table, and replay-data
//! blocks, then run the full decode pipeline over them.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use w3g_replay::{DecodeError, GameSpeed, MessageTarget, Race, Replay, Winner};

const MAGIC: &[u8; 28] = b"Warcraft III recorded game\x1A\x00";

// ============================================================================
// Container synthesis
// ============================================================================

/// Inverse of the settings unmasking: even bytes stored bumped with their
/// mask bit clear, odd bytes verbatim with the bit set.
fn mask_settings(plain: &[u8]) -> Vec<u8> {
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

fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Wraps a decompressed body into a complete replay container, splitting it
/// into `block_sizes`-byte compressed blocks (the last chunk takes the
/// remainder).
fn build_container(version: u32, flags: u16, duration_ms: u32, body: &[u8]) -> Vec<u8> {
    build_container_blocks(version, flags, duration_ms, &split_body(body, usize::MAX))
}

fn split_body(body: &[u8], chunk_len: usize) -> Vec<Vec<u8>> {
    if body.is_empty() {
        return Vec::new();
    }
    let chunk_len = chunk_len.min(body.len());
    body.chunks(chunk_len).map(<[u8]>::to_vec).collect()
}

fn build_container_blocks(
    version: u32,
    flags: u16,
    duration_ms: u32,
    chunks: &[Vec<u8>],
) -> Vec<u8> {
    let new_format = version >= 10032;

    let mut file = Vec::new();
    file.extend_from_slice(MAGIC);
    file.extend_from_slice(&0x44u32.to_le_bytes()); // header size
    file.extend_from_slice(&0u32.to_le_bytes()); // compressed size (unused)
    file.extend_from_slice(&1u32.to_le_bytes()); // sub-header version 1
    file.extend_from_slice(&0u32.to_le_bytes()); // decompressed size (unused)
    file.extend_from_slice(&(chunks.len() as u32).to_le_bytes()); // block count
    file.extend_from_slice(b"PX3W"); // "W3XP" reversed
    file.extend_from_slice(&version.to_le_bytes());
    file.extend_from_slice(&6059u16.to_le_bytes()); // build number
    file.extend_from_slice(&flags.to_le_bytes());
    file.extend_from_slice(&duration_ms.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes()); // checksum

    for chunk in chunks {
        let compressed = deflate(chunk);
        if new_format {
            file.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            file.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        } else {
            file.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
            file.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        }
        file.extend_from_slice(&[0, 0, 0, 0]); // frame checksum
        file.extend_from_slice(&compressed);
    }

    file
}

// ============================================================================
// Body synthesis
// ============================================================================

struct Body {
    data: Vec<u8>,
    version: u32,
}

impl Body {
    fn new(version: u32, game_name: &str, players: &[(u8, &str)]) -> Self {
        assert!(!players.is_empty());
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes()); // reserved
        data.push(0x00); // host record marker
        Self::push_player_record(&mut data, players[0].0, players[0].1);
        data.extend_from_slice(game_name.as_bytes());
        data.push(0);
        data.push(0); // placeholder null after the game name

        let mut plain = vec![2u8, 0b0000_1000, 0, 0]; // fast, default visibility
        plain.extend_from_slice(&[0; 9]);
        plain.extend_from_slice(b"Maps\\(2)BootyBay.w3m\x00");
        plain.extend_from_slice(b"integration\x00\x00");
        data.extend_from_slice(&mask_settings(&plain));
        data.push(0); // settings terminator

        data.extend_from_slice(&(players.len() as u32).to_le_bytes());
        data.push(0x09); // game type: custom
        data.push(0x00); // private flag
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // language id

        for &(id, name) in &players[1..] {
            data.push(0x16);
            Self::push_player_record(&mut data, id, name);
            data.extend_from_slice(&0u32.to_le_bytes());
        }
        data.push(0x19); // end of record list

        // game start record: one slot per player, teams 1..n
        data.extend_from_slice(&0u16.to_le_bytes());
        data.push(players.len() as u8);
        for (slot_id, &(id, _)) in players.iter().enumerate() {
            data.push(id);
            data.push(100); // map download percent
            data.push(0x02); // used
            data.push(0); // not cpu
            data.push(slot_id as u8); // raw team, 1-indexed in the model
            data.push(slot_id as u8); // color
            data.push(0x01); // human
            if version >= 3 {
                data.push(0x01); // ai strength
            }
            if version >= 7 {
                data.push(100); // handicap
            }
        }
        data.extend_from_slice(&0xCAFE_F00Du32.to_le_bytes()); // random seed
        data.push(0x00); // select mode
        data.push(players.len() as u8); // start spot count

        Body { data, version }
    }

    fn push_player_record(data: &mut Vec<u8>, id: u8, name: &str) {
        data.push(id);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.push(0x00); // no additional data
    }

    fn leave(&mut self, reason: u32, player_id: u8, result: u32, unknown: u32) -> &mut Self {
        self.data.push(0x17);
        self.data.extend_from_slice(&reason.to_le_bytes());
        self.data.push(player_id);
        self.data.extend_from_slice(&result.to_le_bytes());
        self.data.extend_from_slice(&unknown.to_le_bytes());
        self
    }

    fn time_slot(&mut self, increment_ms: u16, command_data: &[u8]) -> &mut Self {
        self.data.push(0x1F);
        let len = 2 + command_data.len() as u16;
        self.data.extend_from_slice(&len.to_le_bytes());
        self.data.extend_from_slice(&increment_ms.to_le_bytes());
        self.data.extend_from_slice(command_data);
        self
    }

    fn chat(&mut self, player_id: u8, mode: u32, body: &str) -> &mut Self {
        self.data.push(0x20);
        self.data.push(player_id);
        let len = (1 + 4 + body.len() + 1) as u16;
        self.data.extend_from_slice(&len.to_le_bytes());
        self.data.push(0x20); // flags: in-game message
        self.data.extend_from_slice(&mode.to_le_bytes());
        self.data.extend_from_slice(body.as_bytes());
        self.data.push(0);
        self
    }

    /// One command block holding a plain 0x10 ability for `player_id`.
    fn plain_ability_command(version: u32, player_id: u8, item: &[u8; 4]) -> Vec<u8> {
        let mut action = vec![0x10u8];
        if version < 13 {
            action.push(0x00);
        } else {
            action.extend_from_slice(&0u16.to_le_bytes());
        }
        action.extend_from_slice(item);
        if version >= 7 {
            action.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
            action.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        }

        let mut command = vec![player_id];
        command.extend_from_slice(&(action.len() as u16).to_le_bytes());
        command.extend_from_slice(&action);
        command
    }

    fn finish(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn into_container(&self, flags: u16, duration_ms: u32) -> Vec<u8> {
        build_container(self.version, flags, duration_ms, &self.data)
    }
}

// ============================================================================
// Scenario A: minimal replay
// ============================================================================

#[test]
fn minimal_two_slot_replay_decodes() {
    let body = Body::new(26, "scenario a", &[(1, "Alice"), (2, "Bob")]);
    let file = body.into_container(0x0000, 90_000);

    let replay = Replay::parse(&file).unwrap();

    assert_eq!(replay.slots.len(), 2);
    assert!(!replay.is_multiplayer);
    assert!(replay.actions.is_empty());
    assert!(replay.chat.is_empty());
    assert_eq!(replay.winner, None);
    assert_eq!(replay.saver, None);
    assert_eq!(replay.duration_ms, 90_000);
    assert_eq!(replay.version, 26);
    assert_eq!(replay.options.game_name, "scenario a");
    assert_eq!(replay.options.map_name, "Maps/(2)BootyBay.w3m");
    assert_eq!(replay.options.creator_name, "integration");
    assert_eq!(replay.options.speed, GameSpeed::Fast);
    assert_eq!(replay.random_seed, 0xCAFE_F00D);

    // bidirectional identity holds for every occupied slot
    for slot in &replay.slots {
        if slot.is_occupied() {
            let player = replay.occupant(slot).unwrap();
            assert_eq!(player.slot_id, slot.id);
            assert_eq!(replay.slot_of(player).unwrap().id, slot.id);
        }
    }
    assert_eq!(replay.player(1).unwrap().name, "Alice");
    assert_eq!(replay.slots[0].race, Race::Human);
    assert_eq!(replay.slots[1].team, 2);
}

// ============================================================================
// Scenario B: outright winner from a single leave event
// ============================================================================

#[test]
fn leave_event_declares_winner() {
    let mut body = Body::new(26, "scenario b", &[(1, "Alice"), (2, "Bob")]);
    // Bob (team 2) leaves with reason 0x01, result 0x09: his team won
    body.leave(0x01, 2, 0x09, 42);
    let file = body.into_container(0x8000, 60_000);

    let replay = Replay::parse(&file).unwrap();
    assert!(replay.is_multiplayer);
    assert_eq!(replay.winner, Some(Winner::Team(2)));
}

// ============================================================================
// Scenario C: saver resolution
// ============================================================================

#[test]
fn saver_inherits_pending_win() {
    let mut body = Body::new(26, "scenario c", &[(1, "Alice"), (2, "Bob")]);
    body.time_slot(1_000, &[]);
    // "not last" leave announcing the saver won
    body.leave(0x0C, 2, 0x09, 10);
    body.time_slot(250, &[]);
    // the final leave: Alice is the saver
    body.leave(0x0C, 1, 0x08, 20);
    let file = body.into_container(0x8000, 60_000);

    let replay = Replay::parse(&file).unwrap();
    assert_eq!(replay.saver, Some(1));
    assert_eq!(replay.winner, Some(Winner::Team(1)));
    assert_eq!(replay.player(2).unwrap().leave_time_ms, 1_000);
    assert_eq!(replay.player(1).unwrap().leave_time_ms, 1_250);
}

// ============================================================================
// Magic / framing failures
// ============================================================================

#[test]
fn wrong_magic_is_not_a_replay() {
    let body = Body::new(26, "g", &[(1, "Alice")]);
    let mut file = body.into_container(0, 0);

    for i in 0..28 {
        let mut corrupted = file.clone();
        corrupted[i] = corrupted[i].wrapping_add(1);
        let err = Replay::parse(&corrupted).unwrap_err();
        assert!(
            matches!(err, DecodeError::InvalidMagic { .. }),
            "byte {i}: expected InvalidMagic, got {err}"
        );
    }

    // and a short file cannot be a replay either
    file.truncate(10);
    assert!(Replay::parse(&file).is_err());
}

#[test]
fn block_length_mismatch_is_fatal() {
    let body = Body::new(26, "g", &[(1, "Alice")]);
    let mut file = body.into_container(0, 0);

    // the first block frame sits right after the 0x44-byte header; bump its
    // declared decompressed size
    let declared = u16::from_le_bytes([file[0x46], file[0x47]]);
    file[0x46..0x48].copy_from_slice(&(declared + 1).to_le_bytes());

    let err = Replay::parse(&file).unwrap_err();
    assert!(err.to_string().contains("block 0"), "got: {err}");
}

#[test]
fn truncated_container_is_fatal() {
    let body = Body::new(26, "g", &[(1, "Alice")]);
    let file = body.into_container(0, 0);

    for len in [30, 0x44, 0x48, file.len() - 1] {
        assert!(
            Replay::parse(&file[..len]).is_err(),
            "truncation to {len} bytes must fail"
        );
    }
}

// ============================================================================
// Multi-block and new-format framing
// ============================================================================

#[test]
fn body_split_across_blocks_reassembles() {
    let mut body = Body::new(26, "split", &[(1, "Alice"), (2, "Bob")]);
    body.chat(1, 0x00, "crossing a block boundary");
    let bytes = body.finish();

    // split mid-stream so records straddle the block boundary
    let chunks = split_body(&bytes, 40);
    assert!(chunks.len() > 2);
    let file = build_container_blocks(26, 0, 1000, &chunks);

    let replay = Replay::parse(&file).unwrap();
    assert_eq!(replay.players.len(), 2);
    assert_eq!(replay.chat.len(), 1);
    assert_eq!(replay.chat[0].body, "crossing a block boundary");
}

#[test]
fn new_format_framing_decodes() {
    // version 10032 switches to 32-bit frame fields and wide ability flags
    let mut body = Body::new(10032, "reforged-era", &[(1, "Alice"), (2, "Bob")]);
    let command = Body::plain_ability_command(10032, 2, b"aepk");
    body.time_slot(100, &command);
    let file = body.into_container(0x8000, 5_000);

    let replay = Replay::parse(&file).unwrap();
    assert_eq!(replay.version, 10032);
    assert_eq!(replay.actions.len(), 1);
    assert_eq!(replay.actions[0].player_id, 2);
    assert_eq!(replay.actions[0].time_ms, 100);
}

// ============================================================================
// Stream content
// ============================================================================

#[test]
fn actions_and_chat_carry_game_clock_times() {
    let mut body = Body::new(26, "clock", &[(1, "Alice"), (2, "Bob")]);
    body.time_slot(1_000, &[]);
    body.chat(1, 0x00, "one second in");
    body.time_slot(500, &Body::plain_ability_command(26, 2, b"aepk"));
    body.chat(2, 0x01, "to allies");
    let file = body.into_container(0, 10_000);

    let replay = Replay::parse(&file).unwrap();

    assert_eq!(replay.chat.len(), 2);
    assert_eq!(replay.chat[0].time_ms, 1_000);
    assert_eq!(replay.chat[0].target, MessageTarget::Everyone);
    assert_eq!(replay.chat[0].author_slot, 0);
    assert_eq!(replay.chat[1].time_ms, 1_500);
    assert_eq!(replay.chat[1].target, MessageTarget::Allies);

    assert_eq!(replay.actions.len(), 1);
    assert_eq!(replay.actions[0].time_ms, 1_500);
    assert_eq!(replay.actions[0].player_id, 2);
}

#[test]
fn unknown_trailing_block_keeps_decoded_prefix() {
    let mut body = Body::new(26, "tolerant", &[(1, "Alice"), (2, "Bob")]);
    body.chat(1, 0x00, "kept");
    let mut bytes = body.finish();
    bytes.push(0x7E); // unknown block id stops decoding
    bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    let file = build_container(26, 0, 1000, &bytes);

    let replay = Replay::parse(&file).unwrap();
    assert_eq!(replay.chat.len(), 1);
}

#[test]
fn decoded_options_round_trip_through_remasking() {
    // decoding the same container twice, or re-masking the same plain
    // settings, yields identical options
    let body = Body::new(26, "round trip", &[(1, "Alice")]);
    let file = body.into_container(0, 0);

    let first = Replay::parse(&file).unwrap();
    let second = Replay::parse(&file).unwrap();
    assert_eq!(first.options, second.options);
}
