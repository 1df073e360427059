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

use super::defs::{kind_of, Kinds, COL_NUM, ROW_NUM};
use super::Board;
use crate::defs::{NrOf, Sides};

impl Board {
    // Draw detection on the current path: the fifty-move rule, or the
    // same position hash occurring earlier within the reversible
    // window. A single recurrence already counts as a draw inside the
    // search; insisting on the third occurrence would only delay the
    // inevitable by two plies.
    pub fn is_draw_by_repetition_or_fifty(&self) -> bool {
        if self.game_state.fifty_moves >= 100 {
            return true;
        }

        let len = self.stack.len();
        if len < 5 {
            return false;
        }
        let current = self.game_state.position_hash;
        let window = (self.game_state.fifty_moves as usize).min(len - 1);

        // The earliest possible recurrence is four plies back; the base
        // entry at slot 0 covers cycles through the setup position.
        let mut back = 4;
        while back <= window {
            if self.stack.get_ref(len - 1 - back).pos_hash == current {
                return true;
            }
            back += 2;
        }
        false
    }

    /// Material draw by rule: bare kings, king vs king and one minor,
    /// or same-coloured single bishops. The evaluation performs the
    /// full check; this is the quick subset used by the game layer.
    pub fn insufficient_material(&self) -> bool {
        let mut minors = 0;
        for side in [Sides::WHITE, Sides::BLACK] {
            for idx in self.side_pieces(side) {
                match kind_of(self.rec(idx).piece) {
                    Kinds::KNIGHT | Kinds::BISHOP => minors += 1,
                    _ => return false,
                }
            }
        }
        minors <= 1
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const PIECE_CHARS: [char; NrOf::PIECE_TYPES] = [
            '.', '#', 'P', 'N', 'B', 'R', 'Q', 'K', '?', '?', 'p', 'n', 'b', 'r', 'q', 'k',
        ];
        for rank in (1..=8).rev() {
            write!(f, "{rank} ")?;
            for file in 1..=8 {
                let sq = 11 + rank * 10 + file;
                debug_assert_eq!(ROW_NUM[sq], rank);
                debug_assert_eq!(COL_NUM[sq], file);
                write!(f, " {}", PIECE_CHARS[self.piece_at(sq)])?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;
    use crate::movegen::defs::{Move, MoveFlags};

    #[test]
    fn shuffling_into_repetition_is_a_draw() {
        let mut board = Board::new();
        board
            .fen_read(Some("4k3/8/8/8/8/8/8/R3K3 w - - 0 1"))
            .unwrap();

        let moves = [
            Move::new(Squares::A1, Squares::B1, MoveFlags::NORMAL, 0),
            Move::new(Squares::E8, Squares::D8, MoveFlags::NORMAL, 0),
            Move::new(Squares::B1, Squares::A1, MoveFlags::NORMAL, 0),
            Move::new(Squares::D8, Squares::E8, MoveFlags::NORMAL, 0),
        ];
        for m in moves {
            assert!(!board.is_draw_by_repetition_or_fifty());
            board.make(m);
        }
        assert!(board.is_draw_by_repetition_or_fifty());
    }

    #[test]
    fn pawn_move_breaks_the_repetition_window() {
        let mut board = Board::new();
        board
            .fen_read(Some("4k3/8/8/8/8/8/4P3/R3K3 w - - 0 1"))
            .unwrap();
        board.make(Move::new(Squares::E2, Squares::E3, Pieces::WPAWN, 0));
        board.make(Move::new(Squares::E8, Squares::D8, MoveFlags::NORMAL, 0));
        board.make(Move::new(Squares::A1, Squares::B1, MoveFlags::NORMAL, 0));
        board.make(Move::new(Squares::D8, Squares::E8, MoveFlags::NORMAL, 0));
        assert!(!board.is_draw_by_repetition_or_fifty());
    }

    use crate::board::defs::Pieces;

    #[test]
    fn insufficient_material_cases() {
        let mut board = Board::new();
        board.fen_read(Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1")).unwrap();
        assert!(board.insufficient_material());
        board
            .fen_read(Some("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1"))
            .unwrap();
        assert!(board.insufficient_material());
        board
            .fen_read(Some("4k3/8/8/8/8/8/8/R3K3 w - - 0 1"))
            .unwrap();
        assert!(!board.insufficient_material());
        board
            .fen_read(Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"))
            .unwrap();
        assert!(!board.insufficient_material());
    }
}
