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

use super::defs::{LIGHT_SQ_BIT, DARK_SQ_BIT};
use crate::board::defs::{kind_of, GFlags, Kinds, Pieces, COL_NUM, LIGHT_SQ, ROW_NUM};
use crate::board::Board;
use crate::defs::{Piece, Side, Sides, Square};

// Middle-game king safety, evaluated per side. A castled (or manually
// tucked-away) king wants its pawn shield intact; missing or advanced
// shield pawns hurt, scaled by whether the enemy queen is still on.
// A fianchetto bishop compensates for the one-step hole it guards, and
// an uncastled king with queens on the board is a standing liability.

const CASTLED_BONUS: i32 = 15;
const UNCASTLED_QUEEN_PENALTY: i32 = 25;
const UNCASTLED_NO_RIGHTS_PENALTY: i32 = 15;
const SHIELD_PAWN_ADVANCED: i32 = 10;
const SHIELD_PAWN_MISSING: i32 = 22;
const SHIELD_HOLE_BISHOP_GONE: i32 = 14;
const FIANCHETTO_COVER: i32 = 12;
const CORNERED_ROOK_PENALTY: i32 = 30;

/// Positive is good for `side`. `enemy_queens` scales the shield
/// penalties; `enemy_bishop_colour` judges weakened fianchetto
/// diagonals after the covering bishop left.
pub fn king_safety(
    board: &Board,
    side: Side,
    enemy_queens: u32,
    enemy_bishop_colour: u32,
) -> i32 {
    let king = board.king_square(side);
    let castled_flag = if side == Sides::WHITE {
        GFlags::WCASTLED
    } else {
        GFlags::BCASTLED
    };
    let king_moved_flag = if side == Sides::WHITE {
        GFlags::WKMOVED
    } else {
        GFlags::BKMOVED
    };
    let castled = board.game_state.gflags & castled_flag != 0;
    let home_rank = if side == Sides::WHITE { 1 } else { 8 };

    let mut safety = 0i32;

    if castled || (ROW_NUM[king] == home_rank && COL_NUM[king] != 4 && COL_NUM[king] != 5) {
        if enemy_queens > 0 {
            safety += CASTLED_BONUS;
        }
        safety -= shield_penalty(board, side, king, enemy_queens, enemy_bishop_colour);
        safety -= cornered_rook(board, side, king);
    } else {
        // King in the center. With the castling rights gone this will
        // not fix itself, and with queens on it is acute.
        if enemy_queens > 0 {
            safety -= UNCASTLED_QUEEN_PENALTY;
        }
        if board.game_state.gflags & king_moved_flag != 0 {
            safety -= UNCASTLED_NO_RIGHTS_PENALTY;
        }
    }

    safety
}

// Shield pawns on the three files around the king, two ranks deep.
fn shield_penalty(
    board: &Board,
    side: Side,
    king: Square,
    enemy_queens: u32,
    enemy_bishop_colour: u32,
) -> i32 {
    let forward: isize = if side == Sides::WHITE { 10 } else { -10 };
    let own_pawn = if side == Sides::WHITE {
        Pieces::WPAWN
    } else {
        Pieces::BPAWN
    };
    let own_bishop = if side == Sides::WHITE {
        Pieces::WBISHOP
    } else {
        Pieces::BBISHOP
    };
    let king_file = COL_NUM[king];
    let mut penalty = 0i32;

    for df in -1isize..=1 {
        let file = king_file as isize + df;
        if !(1..=8).contains(&file) {
            continue;
        }
        let base = (king as isize + df) as Square;
        let one = (base as isize + forward) as Square;
        let two = (one as isize + forward) as Square;

        if board.piece_at(one) == own_pawn {
            continue; // shield intact
        }
        if board.piece_at(two) == own_pawn {
            // One-step hole; a fianchetto bishop on the hole covers it.
            if board.piece_at(one) == own_bishop {
                penalty += SHIELD_PAWN_ADVANCED - FIANCHETTO_COVER.min(SHIELD_PAWN_ADVANCED);
            } else {
                penalty += SHIELD_PAWN_ADVANCED;
                // The covering bishop left and the enemy still has one
                // running on the weakened diagonal colour.
                if (file == 2 || file == 7)
                    && enemy_has_bishop_on(enemy_bishop_colour, one)
                {
                    penalty += SHIELD_HOLE_BISHOP_GONE;
                }
            }
        } else {
            penalty += SHIELD_PAWN_MISSING;
        }
    }

    // Without the enemy queen the attack potential is halved.
    if enemy_queens == 0 {
        penalty /= 2;
    }
    penalty
}

fn enemy_has_bishop_on(enemy_bishop_colour: u32, hole: Square) -> bool {
    let needed = if LIGHT_SQ[hole] {
        LIGHT_SQ_BIT
    } else {
        DARK_SQ_BIT
    };
    enemy_bishop_colour & needed != 0
}

// A rook boxed in next to its own unadvanced king never comes into
// play; the classic case is Kf1/Kg1 with the rook still on g1/h1.
fn cornered_rook(board: &Board, side: Side, king: Square) -> i32 {
    let own_rook = if side == Sides::WHITE {
        Pieces::WROOK
    } else {
        Pieces::BROOK
    };
    let king_file = COL_NUM[king];
    if !(6..=7).contains(&king_file) {
        return 0;
    }
    for sq in king + 1..=king + (8 - king_file) {
        let piece = board.piece_at(sq);
        if piece == own_rook {
            return CORNERED_ROOK_PENALTY;
        }
        if piece != Pieces::NONE {
            break;
        }
    }
    0
}

/// Summed white-minus-black safety, scaled down as material leaves
/// the board.
pub fn evaluate_king_safety(
    board: &Board,
    w_queens: u32,
    b_queens: u32,
    w_bishop_colour: u32,
    b_bishop_colour: u32,
    all_pieces: u32,
) -> i32 {
    let raw = king_safety(board, Sides::WHITE, b_queens, b_bishop_colour)
        - king_safety(board, Sides::BLACK, w_queens, w_bishop_colour);
    // 30 men at the start counts full, fading toward the endgame.
    let scale = (all_pieces.min(30) as i32 * 100) / 30;
    raw * scale.max(50) / 100
}

/// Mild development penalties for self-blocked minor pieces in the
/// opening: a bishop parked on its own pawn's only forward square, or
/// a fianchetto bishop walled in by the f/c pawn.
pub fn development_penalties(board: &Board) -> i32 {
    use crate::board::defs::Squares;
    let mut eval = 0i32;

    let blocked = |pawn_sq: Square, block_sq: Square, pawn: Piece| -> bool {
        board.piece_at(pawn_sq) == pawn
            && board.piece_at(block_sq) != Pieces::NONE
            && kind_of(board.piece_at(block_sq)) != Kinds::PAWN
            && piece_side_matches(board.piece_at(block_sq), pawn)
    };

    if blocked(Squares::E2, Squares::E3, Pieces::WPAWN)
        || blocked(Squares::D2, Squares::D3, Pieces::WPAWN)
    {
        eval -= super::defs::DEVELOPMENT_BLOCKED_PAWN;
    }
    if blocked(Squares::E7, Squares::E6, Pieces::BPAWN)
        || blocked(Squares::D7, Squares::D6, Pieces::BPAWN)
    {
        eval += super::defs::DEVELOPMENT_BLOCKED_PAWN;
    }

    // Fianchetto bishop blinded by its own pawn one step ahead.
    for (bishop_sq, pawn_sq, bishop, pawn, sign) in [
        (Squares::G2, Squares::F3, Pieces::WBISHOP, Pieces::WPAWN, -1),
        (Squares::B2, Squares::C3, Pieces::WBISHOP, Pieces::WPAWN, -1),
        (Squares::G7, Squares::F6, Pieces::BBISHOP, Pieces::BPAWN, 1),
        (Squares::B7, Squares::C6, Pieces::BBISHOP, Pieces::BPAWN, 1),
    ] {
        if board.piece_at(bishop_sq) == bishop && board.piece_at(pawn_sq) == pawn {
            eval += sign * super::defs::DEVELOPMENT_BLOCKED_FIANCHETTO;
        }
    }

    eval
}

fn piece_side_matches(piece: Piece, pawn: Piece) -> bool {
    (piece & 8) == (pawn & 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_for(fen: &str) -> Board {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        board
    }

    #[test]
    fn intact_shield_beats_a_broken_one() {
        // Both castled by position; white's shield is gone.
        let broken = board_for("rnbq1rk1/ppppppbp/6p1/8/8/8/PPPPP3/RNBQ1RK1 w - - 0 1");
        let w = king_safety(&broken, Sides::WHITE, 1, 0);
        let b = king_safety(&broken, Sides::BLACK, 1, DARK_SQ_BIT);
        assert!(w < b);
    }

    #[test]
    fn fianchetto_covers_the_hole() {
        let covered = board_for("rnbqk2r/pppppppp/8/8/8/6P1/PPPPPPBP/RNBQ1RK1 w kq - 0 1");
        let empty = board_for("rnbqk2r/pppppppp/8/8/8/6P1/PPPPPP1P/RNBQ1RK1 w kq - 0 1");
        let with_bishop = king_safety(&covered, Sides::WHITE, 1, LIGHT_SQ_BIT);
        let without = king_safety(&empty, Sides::WHITE, 1, LIGHT_SQ_BIT);
        assert!(with_bishop > without);
    }

    #[test]
    fn center_king_with_queens_is_penalized() {
        let board = board_for("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let with_queens = king_safety(&board, Sides::WHITE, 1, 0);
        let no_queens = king_safety(&board_for("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR w KQkq - 0 1"), Sides::WHITE, 0, 0);
        assert!(with_queens < no_queens.max(0) || with_queens < 0);
    }

    #[test]
    fn cornered_rook_is_found() {
        // King g1, rook h1, no castled flag (artificial shuffle).
        let board = board_for("4k3/8/8/8/8/8/PPPPPPPP/6KR w - - 0 1");
        assert_eq!(cornered_rook(&board, Sides::WHITE, board.king_square(Sides::WHITE)), CORNERED_ROOK_PENALTY);
        let free = board_for("4k3/8/8/8/8/8/PPPPPPPP/5RK1 w - - 0 1");
        assert_eq!(cornered_rook(&free, Sides::WHITE, free.king_square(Sides::WHITE)), 0);
    }

    #[test]
    fn development_penalty_for_blocked_center_pawn() {
        // White bishop sitting on e3 in front of the e2 pawn.
        let blocked = board_for("rnbqk1nr/pppp1ppp/8/4p3/8/4B3/PPPPP1PP/RN1QKBNR w KQkq - 0 1");
        assert!(development_penalties(&blocked) < 0);
        let fine = board_for(crate::defs::FEN_START_POSITION);
        assert_eq!(development_penalties(&fine), 0);
    }
}
