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

use std::mem;

// The two per-evaluation scratch structs. Their combined size is
// pinned: both are flat 4-byte-aligned blocks that get zeroed in one
// shot per call, and the layout must not drift apart silently.
#[repr(C)]
#[derive(Default)]
pub struct PieceInfo {
    pub white_pieces: u32,
    pub black_pieces: u32,
    pub all_pieces: u32,
    pub w_queens: u32,
    pub b_queens: u32,
    pub all_queens: u32,
    pub w_rooks: u32,
    pub b_rooks: u32,
    pub all_rooks: u32,
    pub w_bishops: u32,
    pub b_bishops: u32,
    pub w_knights: u32,
    pub b_knights: u32,
    pub all_minors: u32,
    /// Square-colour mask of the bishops: bit 0 dark, bit 1 light.
    pub w_bishop_colour: u32,
    pub b_bishop_colour: u32,
}

#[repr(C)]
pub struct PawnInfo {
    pub w_pawns: u32,
    pub b_pawns: u32,
    pub all_pawns: u32,
    // Per-file minimum/maximum pawn ranks, files 1..=8, slots 0 and 9
    // are sentinels. Minimum arrays start at 9, maximum arrays at 0,
    // so an unbounded-file lookup lands on a value that never matches
    // a real rank test. Preserve this; the backward-pawn scan indexes
    // file-1 and file+1 without a bounds check.
    pub w_min_rows: [u8; 10],
    pub w_max_rows: [u8; 10],
    pub b_min_rows: [u8; 10],
    pub b_max_rows: [u8; 10],
    /// File occupancy masks, bit 0 = A file.
    pub w_mask: u32,
    pub b_mask: u32,
    /// Files with doubled pawns.
    pub w_d_mask: u32,
    pub b_d_mask: u32,
    /// Files with passed pawns.
    pub w_passed_mask: u32,
    pub b_passed_mask: u32,
    /// Good rook files: enemy backward-pawn targets and own passers.
    pub w_rook_files: u32,
    pub b_rook_files: u32,
    pub w_isolated: u32,
    pub b_isolated: u32,
    pub w_backward: u32,
    pub b_backward: u32,
    pub w_doubled: u32,
    pub b_doubled: u32,
    pub w_connected: u32,
    pub b_connected: u32,
    pub w_outside_passers: u32,
    pub b_outside_passers: u32,
    pub blocked_center_files: u32,
    /// Middle-game pawn-structure evaluation, white positive.
    pub extra_eval: i32,
    /// Additional endgame-only pawn terms.
    pub eg_extra_eval: i32,
    pub w_passers: u32,
    pub b_passers: u32,
    pub hash_hit: u32,
}

impl Default for PawnInfo {
    fn default() -> Self {
        // Zero everything, then install the rank sentinels.
        let mut info: PawnInfo = unsafe { mem::zeroed() };
        info.w_min_rows = [9; 10];
        info.b_min_rows = [9; 10];
        info
    }
}

const _: () = assert!(
    mem::size_of::<PawnInfo>() + mem::size_of::<PieceInfo>() == 53 * mem::size_of::<u32>(),
    "PAWN/PIECE info size drifted"
);

pub const DARK_SQ_BIT: u32 = 1;
pub const LIGHT_SQ_BIT: u32 = 2;
pub const TWO_COLOUR: u32 = DARK_SQ_BIT | LIGHT_SQ_BIT;

/// Result bundle of the static evaluation; the score is from white's
/// point of view, the caller negates for black.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalResult {
    pub score: i32,
    /// 0 when the material is a dead draw; otherwise the non-pawn
    /// piece count, which gates the null move.
    pub enough_material: i32,
    pub is_endgame: bool,
    /// Passed-pawn file masks, only defined in the endgame.
    pub w_passed_files: u8,
    pub b_passed_files: u8,
}

// ======================================================================
// Evaluation weights
// ======================================================================

// Lazy evaluation cut: positional terms will not make up this much in
// the middle game.
pub const LAZY_EVAL_MARGIN: i32 = 250;

pub const BISHOP_PAIR_BASE: i32 = 45;
pub const BISHOP_PAIR_MANY_PAWNS: i32 = 15;
pub const MANY_PAWNS: u32 = 13;

pub const TWO_MINORS_VS_ROOK: i32 = 50;
pub const MINOR_FOR_PAWNS_CORRECTION: i32 = 60;

pub const TRAPPED_BISHOP: i32 = 120;
pub const TRAPPED_BISHOP_DEAD: i32 = 60;

// Per-file doubled pawn penalties: edge, flank, center.
pub const DOUBLED_EDGE: i32 = 12;
pub const DOUBLED_FLANK: i32 = 16;
pub const DOUBLED_CENTER: i32 = 20;

pub const ISOLATED_PAWN: i32 = 20;
pub const ISOLATED_DOUBLED_HALF_OPEN: i32 = 12;

pub const BACKWARD_PAWN: i32 = 8;
pub const BACKWARD_PAWN_CENTER: i32 = 16;

/// Passed pawn bonus by rank from the pawn's own point of view.
pub const PASSED_PAWN_BONUS: [i32; 9] = [0, 0, 10, 18, 32, 55, 90, 130, 0];
pub const PASSED_SUPPORTED_EXTRA: i32 = 12;
pub const OUTSIDE_PASSER: i32 = 30;
pub const DEVALUED_MAJORITY: i32 = 25;
pub const BLOCKED_CENTER_FILE_PENALTY: i32 = 12;
pub const BLOCKED_POSITION_PAWNS: u32 = 14;

pub const KNIGHT_PAIR_EG: i32 = 12;
pub const CONNECTED_PASSERS_EG: i32 = 25;
pub const ISOLATED_EG_EXTRA: i32 = 8;

// Side-to-move and contempt adjustments by opening bands.
pub const STM_BONUS_EARLY: i32 = 10;
pub const STM_BONUS_MID: i32 = 5;
pub const CONTEMPT_EARLY: i32 = 35;
pub const CONTEMPT_MID: i32 = 20;

pub const DEVELOPMENT_BLOCKED_PAWN: i32 = 30;
pub const DEVELOPMENT_BLOCKED_FIANCHETTO: i32 = 15;

// Rook placement terms (middle game).
pub const ROOK_HALF_OPEN: i32 = 8;
pub const ROOK_OPEN: i32 = 14;
pub const ROOK_GOOD_FILE: i32 = 10;
pub const ROOK_ON_7TH: i32 = 22;
pub const ROOK_BEHIND_PASSER: i32 = 16;
pub const ROOK_DOUBLED: i32 = 12;
pub const ROOK_TRAPPED_BY_KING: i32 = 30;

/// Precomputed isolated-file mask per 8-bit file occupancy.
pub static ISOLATED_FILES: [u8; 256] = init_isolated_files();

const fn init_isolated_files() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut mask = 0usize;
    while mask < 256 {
        let mut isolated = 0u8;
        let mut file = 0;
        while file < 8 {
            if mask & (1 << file) != 0 {
                let left = file > 0 && (mask & (1 << (file - 1))) != 0;
                let right = file < 7 && (mask & (1 << (file + 1))) != 0;
                if !left && !right {
                    isolated |= 1 << file;
                }
            }
            file += 1;
        }
        table[mask] = isolated;
        mask += 1;
    }
    table
}

/// Chebyshev distance between two mailbox squares.
pub fn square_distance(a: usize, b: usize) -> i32 {
    use crate::board::defs::{COL_NUM, ROW_NUM};
    let df = (COL_NUM[a] as i32 - COL_NUM[b] as i32).abs();
    let dr = (ROW_NUM[a] as i32 - ROW_NUM[b] as i32).abs();
    df.max(dr)
}

/// Distance of a square from the board edge, 0 at the rim.
pub fn edge_distance(sq: usize) -> i32 {
    use crate::board::defs::{COL_NUM, ROW_NUM};
    let f = COL_NUM[sq] as i32;
    let r = ROW_NUM[sq] as i32;
    (f - 1).min(8 - f).min(r - 1).min(8 - r)
}

/// Distance from the board center (the four middle squares count 0).
pub fn center_distance(sq: usize) -> i32 {
    use crate::board::defs::{COL_NUM, ROW_NUM};
    let f = COL_NUM[sq] as i32;
    let r = ROW_NUM[sq] as i32;
    let df = if f <= 4 { 4 - f } else { f - 5 };
    let dr = if r <= 4 { 4 - r } else { r - 5 };
    df.max(dr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;

    #[test]
    fn scratch_struct_sizes_are_pinned() {
        assert_eq!(
            mem::size_of::<PawnInfo>() + mem::size_of::<PieceInfo>(),
            53 * mem::size_of::<u32>()
        );
    }

    #[test]
    fn pawn_info_defaults_carry_the_sentinels() {
        let info = PawnInfo::default();
        assert_eq!(info.w_min_rows, [9; 10]);
        assert_eq!(info.w_max_rows, [0; 10]);
        assert_eq!(info.b_min_rows, [9; 10]);
        assert_eq!(info.b_max_rows, [0; 10]);
        assert_eq!(info.extra_eval, 0);
    }

    #[test]
    fn isolated_file_table() {
        // Lone pawn on the D file.
        assert_eq!(ISOLATED_FILES[0b0000_1000], 0b0000_1000);
        // Neighbouring files protect each other.
        assert_eq!(ISOLATED_FILES[0b0001_1000], 0);
        // A and H are isolated, D/E are not.
        assert_eq!(ISOLATED_FILES[0b1001_1001], 0b1000_0001);
        assert_eq!(ISOLATED_FILES[0], 0);
    }

    #[test]
    fn distances() {
        assert_eq!(square_distance(Squares::A1, Squares::H8), 7);
        assert_eq!(square_distance(Squares::E4, Squares::E4), 0);
        assert_eq!(edge_distance(Squares::A1), 0);
        assert_eq!(edge_distance(Squares::E4), 3);
        assert_eq!(center_distance(Squares::E4), 0);
        assert_eq!(center_distance(Squares::A1), 3);
        assert_eq!(center_distance(Squares::H1), 3);
    }
}
