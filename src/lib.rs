//! # W3G Replay
//!
//! A decoder for Warcraft 3 replay (`.w3g`) files that turns the raw
//! container into a structured, queryable event log.
//!
//! The format is proprietary and undocumented; this crate encodes
//! reverse-engineered knowledge of the byte layouts, the version-dependent
//! field widths, and the bit-packed flags, and runs the whole pipeline:
//!
//! 1. header parsing (magic, version, block count)
//! 2. block-by-block zlib decompression into one body buffer
//! 3. record-stream decoding: players, battle.net accounts, the slot
//!    table, and the obfuscated game-settings string
//! 4. time-sliced action and chat decoding with a running game clock
//! 5. winner deduction from leave events (the container has no explicit
//!    winner field)
//!
//! ## Quick Start
//!
//! ```no_run
//! use w3g_replay::Replay;
//!
//! fn summarize(data: &[u8]) -> w3g_replay::error::Result<()> {
//!     let replay = Replay::parse(data)?;
//!
//!     println!(
//!         "{} on {} ({})",
//!         replay.options.game_name,
//!         replay.options.map_name,
//!         replay.duration_string(),
//!     );
//!     for player in replay.players.values() {
//!         let slot = replay.slot_of(player).unwrap();
//!         println!("  team {} - {}", slot.team, player.display_name());
//!     }
//!     if let Some(winner) = replay.winner {
//!         println!("winner: {winner:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias for decoding operations
//! - [`reader`] - Forward-only binary reading over byte buffers
//! - [`header`] - Header parsing for both sub-header layouts
//! - [`decompress`] - Framed zlib block decompression
//! - [`settings`] - Deobfuscation and parsing of the game-settings string
//! - [`tables`] - Static color/race/status tables and field enumerations
//! - [`records`] - The record-stream state machine over the decompressed body
//! - [`actions`] - Opcode-dispatched ability decoding
//! - [`outcome`] - Winner deduction from leave events
//! - [`replay`] - The decoded, immutable model
//!
//! Decoding is single-threaded and single-pass: one call owns its cursors
//! and its model under construction, so concurrent decodes of different
//! files need no coordination. Malformed input is a terminal condition for
//! that call; on any fatal error the partial model is discarded.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod decompress;
pub mod error;
pub mod header;
pub mod outcome;
pub mod reader;
pub mod records;
pub mod replay;
pub mod settings;
pub mod tables;

// Re-export commonly used types at the crate root
pub use actions::{Ability, AbilityBase, ItemId, ObjectId, Point};
pub use error::{DecodeError, Result};
pub use header::Header;
pub use outcome::{LeaveEvent, OutcomeTracker};
pub use replay::{
    Action, BattleNetAccount, ChatMessage, GameOptions, MessageTarget, Player, Replay, Slot,
    Winner,
};
pub use tables::{
    AiStrength, Color, Expansion, GameSpeed, GameType, ObserverSetting, Race, SlotStatus,
    Visibility, COLORS,
};
