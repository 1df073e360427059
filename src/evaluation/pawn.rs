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

use super::defs::*;
use crate::board::defs::{kind_of, Kinds, Pieces, COL_NUM, ROW_NUM};
use crate::board::Board;
use crate::defs::{Side, Sides};
use crate::engine::transposition::{PawnEntry, PawnTable, PAWN_KEY_ENDGAME};

// Pawn structure evaluation. One scan over both piece lists fills the
// per-file min/max rank tables and the occupancy masks; the structure
// terms are then pure table lookups. Results are cached in the pawn
// hash table, keyed by the pawn hash plus the phase bit, so a hit
// skips everything and feeds the rook evaluation straight from the
// cached file masks.
pub fn evaluate_pawns(
    board: &Board,
    pawn_info: &mut PawnInfo,
    pawn_tt: &mut PawnTable,
    is_endgame: bool,
    computer_side: Option<Side>,
) {
    let key = board.game_state.pawn_hash ^ if is_endgame { PAWN_KEY_ENDGAME } else { 0 };
    if let Some(entry) = pawn_tt.probe(key) {
        pawn_info.extra_eval = entry.eval as i32;
        pawn_info.w_mask = entry.w_files as u32;
        pawn_info.b_mask = entry.b_files as u32;
        pawn_info.w_rook_files = entry.w_rook_files as u32;
        pawn_info.b_rook_files = entry.b_rook_files as u32;
        pawn_info.w_passed_mask = entry.w_passed_files as u32;
        pawn_info.b_passed_mask = entry.b_passed_files as u32;
        pawn_info.hash_hit = 1;
        return;
    }

    scan_pawns(board, pawn_info);
    structure_terms(board, pawn_info);
    endgame_terms(board, pawn_info);
    blocked_position(pawn_info, computer_side);

    if is_endgame {
        pawn_info.extra_eval += pawn_info.eg_extra_eval;
    }

    pawn_tt.store(
        key,
        PawnEntry {
            eval: pawn_info.extra_eval as i16,
            w_files: pawn_info.w_mask as u8,
            b_files: pawn_info.b_mask as u8,
            w_rook_files: pawn_info.w_rook_files as u8,
            b_rook_files: pawn_info.b_rook_files as u8,
            w_passed_files: pawn_info.w_passed_mask as u8,
            b_passed_files: pawn_info.b_passed_mask as u8,
            ..PawnEntry::default()
        },
    );
}

// Single pass: min/max ranks per file and the occupancy masks. The
// min arrays start at 9 and the max arrays at 0; files without pawns
// keep those sentinels, including the out-of-range slots 0 and 9 that
// the neighbour-file lookups below may touch.
fn scan_pawns(board: &Board, info: &mut PawnInfo) {
    for idx in board.side_pieces(Sides::WHITE) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) != Kinds::PAWN {
            continue;
        }
        let file = COL_NUM[rec.square];
        let rank = ROW_NUM[rec.square] as u8;
        let bit = 1u32 << (file - 1);
        if info.w_mask & bit != 0 {
            info.w_d_mask |= bit;
        }
        info.w_mask |= bit;
        if rank < info.w_min_rows[file] {
            info.w_min_rows[file] = rank;
        }
        if rank > info.w_max_rows[file] {
            info.w_max_rows[file] = rank;
        }
    }
    for idx in board.side_pieces(Sides::BLACK) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) != Kinds::PAWN {
            continue;
        }
        let file = COL_NUM[rec.square];
        let rank = ROW_NUM[rec.square] as u8;
        let bit = 1u32 << (file - 1);
        if info.b_mask & bit != 0 {
            info.b_d_mask |= bit;
        }
        info.b_mask |= bit;
        if rank < info.b_min_rows[file] {
            info.b_min_rows[file] = rank;
        }
        if rank > info.b_max_rows[file] {
            info.b_max_rows[file] = rank;
        }
    }
}

fn doubled_penalty(file: usize) -> i32 {
    match file {
        1 | 8 => DOUBLED_EDGE,
        3..=6 => DOUBLED_CENTER,
        _ => DOUBLED_FLANK,
    }
}

fn structure_terms(board: &Board, info: &mut PawnInfo) {
    let mut eval = 0i32;

    // Doubled pawns, with isolated-doubled ones on half-open files
    // marked as rook targets for the opponent.
    for file in 1..=8usize {
        let bit = 1u32 << (file - 1);
        if info.w_d_mask & bit != 0 {
            eval -= doubled_penalty(file);
            info.w_doubled += 1;
            if ISOLATED_FILES[info.w_mask as usize] & bit as u8 != 0
                && info.b_mask & bit == 0
            {
                eval -= ISOLATED_DOUBLED_HALF_OPEN;
                info.b_rook_files |= bit;
            }
        }
        if info.b_d_mask & bit != 0 {
            eval += doubled_penalty(file);
            info.b_doubled += 1;
            if ISOLATED_FILES[info.b_mask as usize] & bit as u8 != 0
                && info.w_mask & bit == 0
            {
                eval += ISOLATED_DOUBLED_HALF_OPEN;
                info.w_rook_files |= bit;
            }
        }
    }

    // Isolated pawns from the precomputed mask table.
    info.w_isolated = ISOLATED_FILES[info.w_mask as usize].count_ones();
    info.b_isolated = ISOLATED_FILES[info.b_mask as usize].count_ones();
    eval -= info.w_isolated as i32 * ISOLATED_PAWN;
    eval += info.b_isolated as i32 * ISOLATED_PAWN;

    // Backward pawns: rearmost pawn of a half-open file whose
    // neighbours are all too far advanced to ever defend it. The
    // file-1 and file+1 lookups run into the sentinel slots on the A
    // and H files and read their initial values there (9 for the min
    // arrays, 0 for the max arrays), which never pass the rank test.
    for file in 1..=8usize {
        let bit = 1u32 << (file - 1);
        let adjacent = (bit << 1 | bit >> 1) & 0xFF;
        if info.w_mask & bit != 0 && info.b_mask & bit == 0 && info.w_mask & adjacent != 0 {
            let rank = info.w_min_rows[file];
            if info.w_min_rows[file - 1] > rank && info.w_min_rows[file + 1] > rank {
                let penalty = if (3..=6).contains(&file) {
                    BACKWARD_PAWN_CENTER
                } else {
                    BACKWARD_PAWN
                };
                eval -= penalty;
                info.w_backward += 1;
                info.b_rook_files |= bit;
            }
        }
        if info.b_mask & bit != 0 && info.w_mask & bit == 0 && info.b_mask & adjacent != 0 {
            let rank = info.b_max_rows[file];
            if info.b_max_rows[file - 1] < rank && info.b_max_rows[file + 1] < rank {
                let penalty = if (3..=6).contains(&file) {
                    BACKWARD_PAWN_CENTER
                } else {
                    BACKWARD_PAWN
                };
                eval += penalty;
                info.b_backward += 1;
                info.w_rook_files |= bit;
            }
        }
    }

    // Passed pawns: nothing of the enemy on the own or adjacent files
    // at the same rank or ahead. With doubled passers only the
    // front-most one gets the credit.
    for idx in board.side_pieces(Sides::WHITE) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) != Kinds::PAWN {
            continue;
        }
        let file = COL_NUM[rec.square];
        let rank = ROW_NUM[rec.square] as u8;
        let blocked = info.b_max_rows[file] >= rank
            || info.b_max_rows[file - 1] >= rank
            || info.b_max_rows[file + 1] >= rank;
        if blocked || info.w_max_rows[file] != rank {
            continue;
        }
        let bit = 1u32 << (file - 1);
        info.w_passed_mask |= bit;
        info.w_rook_files |= bit;
        info.w_passers += 1;
        let mut bonus = PASSED_PAWN_BONUS[rank as usize];
        // A friendly pawn diagonally behind shields the passer.
        if board.piece_at(rec.square - 11) == Pieces::WPAWN
            || board.piece_at(rec.square - 9) == Pieces::WPAWN
        {
            bonus += PASSED_SUPPORTED_EXTRA;
        }
        eval += bonus;
    }
    for idx in board.side_pieces(Sides::BLACK) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) != Kinds::PAWN {
            continue;
        }
        let file = COL_NUM[rec.square];
        let rank = ROW_NUM[rec.square] as u8;
        let blocked = (info.w_min_rows[file] != 9 && info.w_min_rows[file] <= rank)
            || (info.w_min_rows[file - 1] != 9 && info.w_min_rows[file - 1] <= rank)
            || (info.w_min_rows[file + 1] != 9 && info.w_min_rows[file + 1] <= rank);
        if blocked || info.b_min_rows[file] != rank {
            continue;
        }
        let bit = 1u32 << (file - 1);
        info.b_passed_mask |= bit;
        info.b_rook_files |= bit;
        info.b_passers += 1;
        let mut bonus = PASSED_PAWN_BONUS[9 - rank as usize];
        if board.piece_at(rec.square + 11) == Pieces::BPAWN
            || board.piece_at(rec.square + 9) == Pieces::BPAWN
        {
            bonus += PASSED_SUPPORTED_EXTRA;
        }
        eval -= bonus;
    }

    // Connected pawn masks for the endgame terms.
    info.w_connected = (info.w_passed_mask & (info.w_passed_mask >> 1)).count_ones();
    info.b_connected = (info.b_passed_mask & (info.b_passed_mask >> 1)).count_ones();

    info.extra_eval += eval;
}

// Endgame-weighted terms: extra isolani weight, outside passers,
// devalued majorities, connected passers.
fn endgame_terms(_board: &Board, info: &mut PawnInfo) {
    let mut eval = 0i32;

    eval -= info.w_isolated as i32 * ISOLATED_EG_EXTRA;
    eval += info.b_isolated as i32 * ISOLATED_EG_EXTRA;

    eval += info.w_connected as i32 * CONNECTED_PASSERS_EG;
    eval -= info.b_connected as i32 * CONNECTED_PASSERS_EG;

    // Outside passed pawn: an A/B (or G/H) passer with no enemy pawns
    // on that flank and no enemy passer on the opposite one.
    const QUEENSIDE_EDGE: u32 = 0b0000_0011;
    const QUEENSIDE: u32 = 0b0000_0111;
    const KINGSIDE_EDGE: u32 = 0b1100_0000;
    const KINGSIDE: u32 = 0b1110_0000;
    const WEST_HALF: u32 = 0b0000_1111;
    const EAST_HALF: u32 = 0b1111_0000;

    let mut outside = |own_passed: u32, enemy_mask: u32, enemy_passed: u32| -> u32 {
        let mut count = 0;
        if own_passed & QUEENSIDE_EDGE != 0
            && enemy_mask & QUEENSIDE == 0
            && enemy_passed & EAST_HALF == 0
        {
            count += 1;
        }
        if own_passed & KINGSIDE_EDGE != 0
            && enemy_mask & KINGSIDE == 0
            && enemy_passed & WEST_HALF == 0
        {
            count += 1;
        }
        count
    };
    info.w_outside_passers = outside(info.w_passed_mask, info.b_mask, info.b_passed_mask);
    info.b_outside_passers = outside(info.b_passed_mask, info.w_mask, info.w_passed_mask);
    eval += info.w_outside_passers as i32 * OUTSIDE_PASSER;
    eval -= info.b_outside_passers as i32 * OUTSIDE_PASSER;

    // Devalued majority: more pawns on a wing, but nobody has a passer
    // there; the extra pawn will not tell.
    for wing in [WEST_HALF, EAST_HALF] {
        let w = (info.w_mask & wing).count_ones();
        let b = (info.b_mask & wing).count_ones();
        if (info.w_passed_mask | info.b_passed_mask) & wing != 0 {
            continue;
        }
        if w > b {
            eval -= DEVALUED_MAJORITY;
        } else if b > w {
            eval += DEVALUED_MAJORITY;
        }
    }

    info.eg_extra_eval += eval;
}

// Closed-center detection: with nearly all pawns still on the board,
// count head-to-head blockages on the center files and tilt the score
// against the configured computer side. Open positions favour the
// machine.
fn blocked_position(info: &mut PawnInfo, computer_side: Option<Side>) {
    if info.w_mask.count_ones() + info.b_mask.count_ones() == 0 {
        return;
    }
    let total = info.w_pawns + info.b_pawns;
    if total < BLOCKED_POSITION_PAWNS {
        return;
    }
    let mut blocked = 0u32;
    for file in 3..=6usize {
        let w = info.w_max_rows[file];
        let b = info.b_min_rows[file];
        if w != 0 && b != 9 && b == w + 1 {
            blocked += 1;
        }
    }
    info.blocked_center_files = blocked;
    if blocked == 0 {
        return;
    }
    match computer_side {
        Some(Sides::WHITE) => {
            info.extra_eval -= (blocked * BLOCKED_CENTER_FILE_PENALTY as u32) as i32
        }
        Some(Sides::BLACK) => {
            info.extra_eval += (blocked * BLOCKED_CENTER_FILE_PENALTY as u32) as i32
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_for(fen: &str, is_endgame: bool) -> PawnInfo {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mut info = PawnInfo::default();
        // Counts are normally filled by the evaluation's first pass.
        info.w_pawns = board.pawn_count(Sides::WHITE) as u32;
        info.b_pawns = board.pawn_count(Sides::BLACK) as u32;
        info.all_pawns = info.w_pawns + info.b_pawns;
        let mut tt = PawnTable::new();
        evaluate_pawns(&board, &mut info, &mut tt, is_endgame, None);
        info
    }

    #[test]
    fn start_position_is_neutral() {
        let info = info_for(crate::defs::FEN_START_POSITION, false);
        assert_eq!(info.extra_eval, 0);
        assert_eq!(info.w_mask, 0xFF);
        assert_eq!(info.b_mask, 0xFF);
        assert_eq!(info.w_passed_mask, 0);
        assert_eq!(info.w_isolated, 0);
    }

    #[test]
    fn doubled_isolated_pawns_are_penalized() {
        // White: doubled isolated d-pawns; black: healthy structure.
        let info = info_for("4k3/ppp5/8/8/8/3P4/3P4/4K3 w - - 0 1", false);
        assert!(info.extra_eval < -30);
        assert_eq!(info.w_isolated, 1);
        assert_eq!(info.w_doubled, 1);
    }

    #[test]
    fn passed_pawn_detection() {
        // White d5 runs free; the black a7 pawn is passed as well.
        let info = info_for("4k3/p7/8/3P4/8/8/8/4K3 w - - 0 1", false);
        assert_eq!(info.w_passed_mask, 0b0000_1000);
        assert_eq!(info.b_passed_mask, 0b0000_0001);

        // An enemy pawn on the adjacent file at the same rank or ahead
        // spoils it.
        let info = info_for("4k3/8/8/3Pp3/8/8/8/4K3 w - - 0 1", false);
        assert_eq!(info.w_passed_mask, 0);
    }

    #[test]
    fn passed_pawn_blocked_by_adjacent_file() {
        let info = info_for("4k3/4p3/8/3P4/8/8/8/4K3 w - - 0 1", false);
        // The e7 pawn guards the d-file promotion path.
        assert_eq!(info.w_passed_mask, 0);
    }

    #[test]
    fn doubled_passers_credit_only_the_front_pawn() {
        let info = info_for("4k3/8/8/3P4/3P4/8/8/4K3 w - - 0 1", false);
        assert_eq!(info.w_passers, 1);
        assert_eq!(info.w_passed_mask, 0b0000_1000);
    }

    #[test]
    fn backward_pawn_marks_a_rook_target() {
        // White d3 pawn on a half-open file, neighbours ahead of it.
        let info = info_for("4k3/8/8/2p1p3/2P1P3/3P4/8/4K3 b - - 0 1", false);
        assert!(info.w_backward >= 1);
        assert_ne!(info.b_rook_files & 0b0000_1000, 0);
    }

    #[test]
    fn outside_passer_counts_in_the_endgame() {
        // White a-pawn passer, all other pawns on the king side.
        let mg = info_for("4k3/5ppp/8/P7/8/8/5PPP/4K3 w - - 0 1", false);
        let eg = info_for("4k3/5ppp/8/P7/8/8/5PPP/4K3 w - - 0 1", true);
        assert_eq!(eg.w_outside_passers, 1);
        assert!(eg.extra_eval > mg.extra_eval);
    }

    #[test]
    fn cache_hit_returns_the_same_result() {
        let mut board = Board::new();
        board
            .fen_read(Some("4k3/pp4pp/8/8/8/8/PPP3PP/4K3 w - - 0 1"))
            .unwrap();
        let mut tt = PawnTable::new();

        let mut first = PawnInfo::default();
        evaluate_pawns(&board, &mut first, &mut tt, false, None);
        assert_eq!(first.hash_hit, 0);

        let mut second = PawnInfo::default();
        evaluate_pawns(&board, &mut second, &mut tt, false, None);
        assert_eq!(second.hash_hit, 1);
        assert_eq!(second.extra_eval, first.extra_eval);
        assert_eq!(second.w_mask, first.w_mask);
        assert_eq!(second.w_rook_files, first.w_rook_files);
    }

    #[test]
    fn blocked_center_tilts_against_the_computer() {
        let fen = "rnbqkbnr/pp1ppp1p/2p3p1/3PP3/2P2P2/8/PP4PP/RNBQKBNR b KQkq - 0 1";
        // Not enough pawns blocked head-to-head here; build a truly
        // locked center instead.
        let locked = "rnbqkbnr/pp4pp/2pppp2/3PP3/2P2P2/8/PP4PP/RNBQKBNR w KQkq - 0 1";
        let _ = fen;
        let mut board = Board::new();
        board.fen_read(Some(locked)).unwrap();
        let mut info = PawnInfo::default();
        info.w_pawns = board.pawn_count(Sides::WHITE) as u32;
        info.b_pawns = board.pawn_count(Sides::BLACK) as u32;
        info.all_pawns = info.w_pawns + info.b_pawns;
        let mut tt = PawnTable::new();
        evaluate_pawns(&board, &mut info, &mut tt, false, Some(Sides::WHITE));
        let with_comp = info.extra_eval;

        let mut info2 = PawnInfo::default();
        info2.w_pawns = info.w_pawns;
        info2.b_pawns = info.b_pawns;
        info2.all_pawns = info.all_pawns;
        let mut tt2 = PawnTable::new();
        evaluate_pawns(&board, &mut info2, &mut tt2, false, None);
        assert!(with_comp <= info2.extra_eval);
    }
}
