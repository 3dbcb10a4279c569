//! Winner deduction from leave events.
//!
//! The container carries no explicit winner field. What it does carry is one
//! LeaveGame record per participant, each with a reason code, a result code,
//! and an opaque 32-bit value that tends to increase while the recording
//! client still considered itself winning. [`OutcomeTracker`] consumes these
//! records in stream order and infers the winning team, a draw, or nothing.
//!
//! The inference is best-effort over incomplete information. The key facts
//! it leans on:
//!
//! - the last leave event belongs to the "saver", the player whose client
//!   wrote the replay;
//! - reason 0x01 or 0x0E with result 0x09 marks the leaver's team as the
//!   outright winner;
//! - reason 0x0C events seen before the saver is known can pre-announce
//!   that the saver won (result 0x09) or that the game drew (result 0x0A);
//! - the saver's own reason-0x0C leave decides by result code, consulting
//!   whether the opaque value increased for the ambiguous 0x07/0x0B cases.
//!
//! Once a winner or draw is decided it is never overwritten by a later
//! event.

use crate::replay::Winner;

/// One LeaveGame record, as read from the replay-data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveEvent {
    /// Reason code.
    pub reason: u32,

    /// Id of the leaving player.
    pub player_id: u8,

    /// Result code.
    pub result: u32,

    /// Opaque counter checked for increase between consecutive leaves.
    pub unknown: u32,
}

/// How far saver identification has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaverState {
    /// No saver known and nothing pre-announced.
    NoSaver,

    /// No saver known yet, but a "not last" event already told us the
    /// saver's team wins once we learn who the saver is.
    PendingWin,

    /// The saver and their team are known.
    Resolved {
        /// Id of the saving player.
        player_id: u8,
        /// Team of the saving player, 1-indexed.
        team: u8,
    },
}

/// Event-driven winner inference.
///
/// Feed every LeaveGame record, in order, to
/// [`record_leave`](OutcomeTracker::record_leave); read the conclusions off
/// [`winner`](OutcomeTracker::winner) and [`saver`](OutcomeTracker::saver)
/// when the stream ends.
#[derive(Debug, Clone)]
pub struct OutcomeTracker {
    leaves_seen: usize,
    previous_unknown: u32,
    saver: SaverState,
    winner: Option<Winner>,
}

impl Default for OutcomeTracker {
    fn default() -> Self {
        OutcomeTracker::new()
    }
}

impl OutcomeTracker {
    /// Creates a tracker with nothing inferred yet.
    #[must_use]
    pub fn new() -> Self {
        OutcomeTracker {
            leaves_seen: 0,
            previous_unknown: 0,
            saver: SaverState::NoSaver,
            winner: None,
        }
    }

    /// Consumes one leave event.
    ///
    /// `leaver_team` is the (1-indexed) team of the leaving player and
    /// `total_players` the number of players in the replay; the event whose
    /// ordinal reaches that count identifies the saver.
    pub fn record_leave(&mut self, event: &LeaveEvent, leaver_team: u8, total_players: usize) {
        let increased = event.unknown > self.previous_unknown;
        self.previous_unknown = event.unknown;

        self.leaves_seen += 1;

        // the last leave action is by the saver
        if self.leaves_seen == total_players {
            let pending_win = self.saver == SaverState::PendingWin;
            self.saver = SaverState::Resolved {
                player_id: event.player_id,
                team: leaver_team,
            };
            if pending_win {
                self.set_winner(Winner::Team(leaver_team));
            }
        }

        match event.reason {
            0x01 | 0x0E => {
                if event.result == 0x09 {
                    self.set_winner(Winner::Team(leaver_team));
                }
            }
            0x0C => match self.saver {
                SaverState::Resolved { team, .. } => match event.result {
                    // ambiguous results count only if the opaque value grew
                    0x07 | 0x0B => {
                        if increased {
                            self.set_winner(Winner::Team(team));
                        }
                    }
                    0x09 => self.set_winner(Winner::Team(team)),
                    _ => {}
                },
                // "not last" semantics: the saver is still unknown
                _ => match event.result {
                    0x09 => {
                        if self.saver == SaverState::NoSaver {
                            self.saver = SaverState::PendingWin;
                        }
                    }
                    0x0A => self.set_winner(Winner::Draw),
                    _ => {}
                },
            },
            _ => {}
        }
    }

    /// The inferred winner, if any event was conclusive.
    #[must_use]
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Id of the saver, once the last leave event has been seen.
    #[must_use]
    pub fn saver(&self) -> Option<u8> {
        match self.saver {
            SaverState::Resolved { player_id, .. } => Some(player_id),
            _ => None,
        }
    }

    fn set_winner(&mut self, winner: Winner) {
        if self.winner.is_none() {
            self.winner = Some(winner);
        }
    }
}
