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
use crate::board::defs::{kind_of, to64, Kinds, Squares, COL_NUM, LIGHT_SQ, ROW_NUM};
use crate::board::Board;
use crate::defs::{Side, Sides, Square, PAWN_V};
use crate::engine::kpk::KpkTable;

// Endgame refinement: king activity, the knight pair, and a set of
// specific material endings where raw material lies. Basic mates get
// a driving gradient toward the right board region, the classic
// fortress draws get flattened toward zero.

const DRIVE_BASE: i32 = 300;
const KING_CENTER_WEIGHT: i32 = 6;

pub fn endgame_evaluation(
    board: &Board,
    pawn_info: &PawnInfo,
    piece_info: &PieceInfo,
    kpk: Option<&KpkTable>,
    side_to_move: Side,
    eval: &mut i32,
) {
    let wk = board.king_square(Sides::WHITE);
    let bk = board.king_square(Sides::BLACK);

    // Active kings first; centralization is most of endgame play.
    *eval += (center_distance(bk) - center_distance(wk)) * KING_CENTER_WEIGHT;

    // Two knights do not complement each other.
    if piece_info.w_knights >= 2 {
        *eval -= KNIGHT_PAIR_EG;
    }
    if piece_info.b_knights >= 2 {
        *eval += KNIGHT_PAIR_EG;
    }

    let w_minors = piece_info.w_bishops + piece_info.w_knights;
    let b_minors = piece_info.b_bishops + piece_info.b_knights;
    let w_men = piece_info.w_queens + piece_info.w_rooks + w_minors + pawn_info.w_pawns;
    let b_men = piece_info.b_queens + piece_info.b_rooks + b_minors + pawn_info.b_pawns;

    // White attacks a bare king.
    if b_men == 0 {
        if piece_info.w_queens > 0 {
            *eval += drive_to_edge(bk, wk) + 150;
        } else if piece_info.w_rooks > 0 {
            *eval += drive_to_edge(bk, wk);
        } else if piece_info.w_bishops == 1
            && piece_info.w_knights == 1
            && w_men == 2
        {
            let light = bishop_colour_is_light(board, Sides::WHITE);
            *eval += drive_to_corner(bk, wk, light);
        } else if w_men == pawn_info.w_pawns {
            pawn_endings_vs_bare_king(board, kpk, side_to_move, Sides::WHITE, eval);
        }
        if piece_info.w_bishops == 1 && w_men == pawn_info.w_pawns + 1 {
            wrong_bishop_draw(board, Sides::WHITE, pawn_info, eval);
        }
        return;
    }
    if w_men == 0 {
        if piece_info.b_queens > 0 {
            *eval -= drive_to_edge(wk, bk) + 150;
        } else if piece_info.b_rooks > 0 {
            *eval -= drive_to_edge(wk, bk);
        } else if piece_info.b_bishops == 1
            && piece_info.b_knights == 1
            && b_men == 2
        {
            let light = bishop_colour_is_light(board, Sides::BLACK);
            *eval -= drive_to_corner(wk, bk, light);
        } else if b_men == pawn_info.b_pawns {
            pawn_endings_vs_bare_king(board, kpk, side_to_move, Sides::BLACK, eval);
        }
        if piece_info.b_bishops == 1 && b_men == pawn_info.b_pawns + 1 {
            wrong_bishop_draw(board, Sides::BLACK, pawn_info, eval);
        }
        return;
    }

    // Piece versus piece/pawn endings.
    if pawn_info.all_pawns == 0 {
        // KR vs minor is a book draw; KQ vs KR is won but takes work.
        if piece_info.w_rooks == 1 && w_men == 1 && b_minors == 1 && b_men == 1 {
            *eval /= 8;
        } else if piece_info.b_rooks == 1 && b_men == 1 && w_minors == 1 && w_men == 1 {
            *eval /= 8;
        } else if piece_info.w_queens == 1 && w_men == 1 && piece_info.b_rooks == 1 && b_men == 1
        {
            *eval = PAWN_V + drive_to_edge(bk, wk) / 2;
        } else if piece_info.b_queens == 1 && b_men == 1 && piece_info.w_rooks == 1 && w_men == 1
        {
            *eval = -(PAWN_V + drive_to_edge(wk, bk) / 2);
        }
        return;
    }

    // KQ vs KP: a rook or bishop pawn on its 7th with the defending
    // king next to it is a fortress.
    if piece_info.w_queens == 1 && w_men == 1 && b_men == pawn_info.b_pawns && b_men == 1 {
        if queen_vs_pawn_fortress(board, Sides::BLACK, wk) {
            *eval = 0;
            return;
        }
    }
    if piece_info.b_queens == 1 && b_men == 1 && w_men == pawn_info.w_pawns && w_men == 1 {
        if queen_vs_pawn_fortress(board, Sides::WHITE, bk) {
            *eval = 0;
            return;
        }
    }

    // KR vs KP: with the pawn far advanced, escorted by its king, and
    // the rook's king cut off, the rook may have to give itself up.
    if piece_info.w_rooks == 1 && w_men == 1 && b_men == pawn_info.b_pawns && b_men == 1 {
        if rook_vs_pawn_drawish(board, Sides::BLACK, wk, side_to_move) {
            *eval /= 8;
        }
        return;
    }
    if piece_info.b_rooks == 1 && b_men == 1 && w_men == pawn_info.w_pawns && w_men == 1 {
        if rook_vs_pawn_drawish(board, Sides::WHITE, bk, side_to_move) {
            *eval /= 8;
        }
    }
}

/// Gradient for the basic mates: push the defender to the edge, bring
/// the attacker king close.
fn drive_to_edge(def_king: Square, att_king: Square) -> i32 {
    DRIVE_BASE + (3 - edge_distance(def_king)) * 25 + (7 - square_distance(def_king, att_king)) * 12
}

/// Bishop-and-knight mate: only the corner of the bishop's colour
/// works, so the gradient aims there.
fn drive_to_corner(def_king: Square, att_king: Square, light_bishop: bool) -> i32 {
    let corners: [Square; 2] = if light_bishop {
        [Squares::A8, Squares::H1]
    } else {
        [Squares::A1, Squares::H8]
    };
    let corner_dist = corners
        .iter()
        .map(|&c| square_distance(def_king, c))
        .min()
        .unwrap();
    DRIVE_BASE + (7 - corner_dist) * 25 + (7 - square_distance(def_king, att_king)) * 12
}

fn bishop_colour_is_light(board: &Board, side: Side) -> bool {
    for idx in board.side_pieces(side) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) == Kinds::BISHOP {
            return LIGHT_SQ[rec.square];
        }
    }
    false
}

// King and pawn(s) against a bare king. A single pawn goes to the
// bitbase when present; otherwise, and for the extra pawns, the rule
// of the square decides the race.
fn pawn_endings_vs_bare_king(
    board: &Board,
    kpk: Option<&KpkTable>,
    side_to_move: Side,
    strong: Side,
    eval: &mut i32,
) {
    let strong_king = board.king_square(strong);
    let weak_king = board.king_square(strong ^ 1);
    let sign = if strong == Sides::WHITE { 1 } else { -1 };
    let mut pawns = [0 as Square; 8];
    let mut n_pawns = 0;
    for idx in board.side_pieces(strong) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) == Kinds::PAWN && n_pawns < 8 {
            pawns[n_pawns] = rec.square;
            n_pawns += 1;
        }
    }
    let pawns = &pawns[..n_pawns];

    if pawns.len() == 1 {
        let pawn = pawns[0];
        if let Some(table) = kpk {
            let win = if strong == Sides::WHITE {
                table.probe(
                    side_to_move,
                    to64(strong_king),
                    to64(pawn),
                    to64(weak_king),
                )
            } else {
                table.probe_reverse(side_to_move, to64(weak_king), to64(pawn), to64(strong_king))
            };
            if !win {
                *eval = 0;
            } else {
                *eval += sign * (DRIVE_BASE + pawn_advance(pawn, strong) * 20);
            }
            return;
        }
        // No table wired in: the rule of the square, with the pawn's
        // first double step folded in.
        if !defender_in_the_square(pawn, strong, weak_king, side_to_move) {
            *eval += sign * (DRIVE_BASE + pawn_advance(pawn, strong) * 20);
        } else if square_distance(strong_king, pawn) > 1 {
            // Unescorted and caught: at best a laborious win, often a
            // draw. Flatten it.
            *eval /= 4;
        }
        return;
    }

    // Several pawns win unless every one of them falls; just reward
    // the most advanced runner.
    if let Some(&best) = pawns
        .iter()
        .max_by_key(|&&p| pawn_advance(p, strong))
    {
        if !defender_in_the_square(best, strong, weak_king, side_to_move) {
            *eval += sign * (DRIVE_BASE / 2 + pawn_advance(best, strong) * 16);
        }
    }
}

/// Ranks the pawn has already walked.
fn pawn_advance(pawn: Square, side: Side) -> i32 {
    if side == Sides::WHITE {
        ROW_NUM[pawn] as i32 - 2
    } else {
        7 - ROW_NUM[pawn] as i32
    }
}

/// Rule of the square: can the defending king still reach the
/// promotion square in time?
fn defender_in_the_square(pawn: Square, side: Side, def_king: Square, stm: Side) -> bool {
    let promo_rank = if side == Sides::WHITE { 8 } else { 1 };
    let promo_sq = if side == Sides::WHITE {
        91 + COL_NUM[pawn] - 1
    } else {
        21 + COL_NUM[pawn] - 1
    };
    // The double step means a rank-2 pawn races like a rank-3 one.
    let mut steps = (promo_rank as i32 - ROW_NUM[pawn] as i32).abs();
    if pawn_advance(pawn, side) == 0 {
        steps -= 1;
    }
    let mut king_steps = square_distance(def_king, promo_sq);
    if stm != side {
        king_steps -= 1; // defender moves first
    }
    king_steps <= steps
}

// Wrong-bishop rook-pawn: all pawns on the rook file whose promotion
// corner the bishop does not control, the defending king holding the
// corner. Includes the A/H-file stalemate trap with the king boxed in.
fn wrong_bishop_draw(board: &Board, strong: Side, pawn_info: &PawnInfo, eval: &mut i32) {
    let (own_mask, corner_a, corner_h) = if strong == Sides::WHITE {
        (pawn_info.w_mask, Squares::A8, Squares::H8)
    } else {
        (pawn_info.b_mask, Squares::A1, Squares::H1)
    };
    let weak_king = board.king_square(strong ^ 1);
    let light = bishop_colour_is_light(board, strong);

    let (corner, on_file) = if own_mask == 0b0000_0001 {
        (corner_a, true)
    } else if own_mask == 0b1000_0000 {
        (corner_h, true)
    } else {
        (0, false)
    };
    if !on_file {
        return;
    }
    if LIGHT_SQ[corner] != light && square_distance(weak_king, corner) <= 1 {
        *eval = 0;
    }
}

// Queen against a rook or bishop pawn on the 7th (seen from the pawn's
// side) with the defender's king adjacent: stalemate tricks hold the
// draw when the attacking king is not already on top of it.
fn queen_vs_pawn_fortress(board: &Board, pawn_side: Side, attacker_king: Square) -> bool {
    let mut pawn = 0;
    for idx in board.side_pieces(pawn_side) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) == Kinds::PAWN {
            pawn = rec.square;
        }
    }
    if pawn == 0 {
        return false;
    }
    let rank = ROW_NUM[pawn];
    let on_seventh = if pawn_side == Sides::WHITE {
        rank == 7
    } else {
        rank == 2
    };
    let file = COL_NUM[pawn];
    let fortress_file = matches!(file, 1 | 3 | 6 | 8);
    let own_king = board.king_square(pawn_side);
    on_seventh
        && fortress_file
        && square_distance(own_king, pawn) <= 1
        && square_distance(attacker_king, pawn) > 2
}

// Rook against a far advanced, escorted pawn with the rook's king out
// of the square: the rook must sacrifice itself for the pawn.
fn rook_vs_pawn_drawish(board: &Board, pawn_side: Side, rook_king: Square, stm: Side) -> bool {
    let mut pawn = 0;
    for idx in board.side_pieces(pawn_side) {
        let rec = board.rec(idx);
        if kind_of(rec.piece) == Kinds::PAWN {
            pawn = rec.square;
        }
    }
    if pawn == 0 {
        return false;
    }
    let own_king = board.king_square(pawn_side);
    pawn_advance(pawn, pawn_side) >= 4
        && square_distance(own_king, pawn) <= 1
        && !defender_in_the_square(pawn, pawn_side, rook_king, stm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn kpk_table() -> &'static KpkTable {
        static TABLE: OnceLock<KpkTable> = OnceLock::new();
        TABLE.get_or_init(KpkTable::generate)
    }

    fn run(fen: &str, base_eval: i32, with_kpk: bool) -> i32 {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mut pawn_info = PawnInfo::default();
        let mut piece_info = PieceInfo::default();
        for side in [Sides::WHITE, Sides::BLACK] {
            for idx in board.side_pieces(side) {
                let kind = kind_of(board.rec(idx).piece);
                match (side, kind) {
                    (Sides::WHITE, Kinds::PAWN) => pawn_info.w_pawns += 1,
                    (Sides::BLACK, Kinds::PAWN) => pawn_info.b_pawns += 1,
                    (Sides::WHITE, Kinds::QUEEN) => piece_info.w_queens += 1,
                    (Sides::BLACK, Kinds::QUEEN) => piece_info.b_queens += 1,
                    (Sides::WHITE, Kinds::ROOK) => piece_info.w_rooks += 1,
                    (Sides::BLACK, Kinds::ROOK) => piece_info.b_rooks += 1,
                    (Sides::WHITE, Kinds::BISHOP) => piece_info.w_bishops += 1,
                    (Sides::BLACK, Kinds::BISHOP) => piece_info.b_bishops += 1,
                    (Sides::WHITE, Kinds::KNIGHT) => piece_info.w_knights += 1,
                    (Sides::BLACK, Kinds::KNIGHT) => piece_info.b_knights += 1,
                    _ => {}
                }
            }
        }
        pawn_info.all_pawns = pawn_info.w_pawns + pawn_info.b_pawns;
        // Pawn masks for the wrong-bishop check.
        for side in [Sides::WHITE, Sides::BLACK] {
            for idx in board.side_pieces(side) {
                let rec = board.rec(idx);
                if kind_of(rec.piece) == Kinds::PAWN {
                    let bit = 1u32 << (COL_NUM[rec.square] - 1);
                    if side == Sides::WHITE {
                        pawn_info.w_mask |= bit;
                    } else {
                        pawn_info.b_mask |= bit;
                    }
                }
            }
        }
        let mut eval = base_eval;
        let kpk = with_kpk.then(kpk_table);
        endgame_evaluation(
            &board,
            &pawn_info,
            &piece_info,
            kpk,
            board.us(),
            &mut eval,
        );
        eval
    }

    #[test]
    fn rook_mate_drives_the_king_to_the_edge() {
        let centered = run("8/8/8/3k4/8/3K4/8/7R w - - 0 1", 500, false);
        let cornered = run("k7/8/1K6/8/8/8/8/7R w - - 0 1", 500, false);
        assert!(cornered > centered);
        assert!(centered > 500);
    }

    #[test]
    fn bishop_knight_mate_prefers_the_right_corner() {
        // Dark-squared bishop: a1/h8 are the mating corners.
        let right = run("7k/8/5K2/8/8/8/8/B5N1 w - - 0 1", 600, false);
        let wrong = run("k7/8/2K5/8/8/8/8/B5N1 w - - 0 1", 600, false);
        assert!(right > wrong);
    }

    #[test]
    fn wrong_rook_pawn_is_a_dead_draw() {
        // Light corner a8? No: bishop is dark-squared, pawn on a-file,
        // black king sits on a8. Draw.
        let eval = run("k7/8/1K6/P7/8/8/8/2B5 w - - 0 1", 400, false);
        assert_eq!(eval, 0);
        // The same with the right bishop colour stays winning.
        let winning = run("k7/8/1K6/P7/8/8/8/3B4 w - - 0 1", 400, false);
        assert!(winning > 0);
    }

    #[test]
    fn kpk_probe_flattens_drawn_pawn_endings() {
        // Ke6/Pe5/ke8, black to move is drawn.
        let drawn = run("4k3/8/4K3/4P3/8/8/8/8 b - - 0 1", 200, true);
        assert_eq!(drawn, 0);
        // White to move in the same layout wins.
        let won = run("4k3/8/4K3/4P3/8/8/8/8 w - - 0 1", 200, true);
        assert!(won > 200);
    }

    #[test]
    fn rule_of_the_square_without_a_table() {
        // Pawn h5, black king on a8 far outside the square.
        let runaway = run("k7/8/8/7P/8/8/8/7K w - - 0 1", 100, false);
        assert!(runaway > 250);
        // King right next to the promotion path: nothing special.
        let caught = run("7k/8/8/7P/8/8/8/K7 b - - 0 1", 100, false);
        assert!(caught <= 100);
    }

    #[test]
    fn queen_vs_rook_pawn_fortress() {
        // Black pawn a2, black king b1? King must be adjacent to pawn.
        let fortress = run("8/8/8/8/4Q3/8/pk6/4K3 w - - 0 1", 700, false);
        assert_eq!(fortress, 0);
        // A center pawn is no fortress.
        let no_fortress = run("8/8/8/8/4Q3/8/1k1p4/4K3 w - - 0 1", 700, false);
        assert_ne!(no_fortress, 0);
    }

    #[test]
    fn rook_vs_minor_is_drawish() {
        let eval = run("4k3/8/8/3n4/8/8/8/R3K3 w - - 0 1", 200, false);
        assert!(eval.abs() <= 40);
    }
}
