/* =======================================================================
PocketKnight is a chess engine core for battery-powered embedded
hardware: a few hundred kilobytes of ROM for data tables, a few tens
of kilobytes of RAM, one cooperative thread.

PocketKnight is written in the Rust programming language. It uses
classical alpha/beta search concepts which are well-known and in use
by most if not all mailbox-based chess engines.

PocketKnight is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License version 3 as
published by the Free Software Foundation.

PocketKnight is distributed in the hope that it will be useful, but
WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
General Public License for more details.
======================================================================= */

use super::defs::Hash;
use crate::defs::{Side, Sides, Square};

// This struct holds the quickly-changing part of the position: the
// state that make() alters and unmake() must restore exactly.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GameState {
    pub active_color: u8,
    /// Moved/castled flag word, see board::defs::GFlags.
    pub gflags: u16,
    /// En-passant target square, 0 when not available.
    pub en_passant: Square,
    /// Plies since the last capture or pawn move.
    pub fifty_moves: u16,
    pub move_number: u16,
    /// Raw material balance in centipawns, white positive.
    pub material: i32,
    pub position_hash: Hash,
    pub pawn_hash: Hash,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            active_color: Sides::WHITE as u8,
            gflags: 0,
            en_passant: 0,
            fifty_moves: 0,
            move_number: 1,
            material: 0,
            position_hash: 0,
            pawn_hash: 0,
        }
    }

    pub fn side_to_move(&self) -> Side {
        self.active_color as Side
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
