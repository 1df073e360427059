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

pub mod defs;
mod fen;
mod gamestate;
mod playmove;
mod stack;
mod utils;
mod zobrist;

pub use self::fen::FenError;
pub use self::gamestate::GameState;
pub use self::stack::{MoveStack, Special, StackEntry};

use self::defs::{kind_of, Arena, Hash, Kinds, Pieces};
use self::zobrist::ZobristRandoms;
use crate::defs::{
    NrOf, Piece, Side, Sides, Square, BISHOP_V, KNIGHT_V, PAWN_V, QUEEN_V, ROOK_V,
};
use std::sync::Arc;

// This file implements the engine's board representation: a 12x10
// mailbox of arena indices plus a fixed arena of piece records that
// are doubly linked into one list per side, headed by the king.
// Captured records are unlinked but persist; make/unmake restores the
// linkage exactly.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PieceRec {
    pub piece: Piece,
    /// Mailbox square, 0 while captured.
    pub square: Square,
    /// Pseudo-legal move count, refreshed by the move generator.
    pub mobility: i8,
    /// Arena index of the next piece in the side list, Arena::NONE at the end.
    pub next: u8,
    /// Arena index of the previous piece; the king's prev is Arena::NONE.
    pub prev: u8,
}

impl PieceRec {
    fn empty() -> Self {
        Self {
            piece: Pieces::NONE,
            square: 0,
            mobility: 0,
            next: Arena::NONE,
            prev: Arena::NONE,
        }
    }
}

pub struct Board {
    pub cells: [u8; NrOf::CELLS],
    pub arena: [PieceRec; NrOf::ARENA],
    pub king_square: [Square; Sides::BOTH],
    pub game_state: GameState,
    pub stack: MoveStack,
    zr: Arc<ZobristRandoms>,
}

// Public functions for use by other modules.
impl Board {
    pub fn new() -> Self {
        let mut board = Self {
            cells: [Arena::OFFBOARD; NrOf::CELLS],
            arena: [PieceRec::empty(); NrOf::ARENA],
            king_square: [0; Sides::BOTH],
            game_state: GameState::new(),
            stack: MoveStack::new(),
            zr: Arc::new(ZobristRandoms::new()),
        };
        board.wipe();
        board
    }

    /// Piece type on a cell; EDGE on sentinel cells, NONE when empty.
    pub fn piece_at(&self, square: Square) -> Piece {
        self.arena[self.cells[square] as usize].piece
    }

    pub fn rec(&self, index: u8) -> &PieceRec {
        &self.arena[index as usize]
    }

    pub fn rec_mut(&mut self, index: u8) -> &mut PieceRec {
        &mut self.arena[index as usize]
    }

    /// Returns the side to move.
    pub fn us(&self) -> Side {
        self.game_state.side_to_move()
    }

    /// Returns the side that is NOT moving.
    pub fn opponent(&self) -> Side {
        self.game_state.side_to_move() ^ 1
    }

    pub fn king_square(&self, side: Side) -> Square {
        self.king_square[side]
    }

    /// Iterate the arena indices of a side's pieces, king excluded.
    pub fn side_pieces(&self, side: Side) -> PieceIter<'_> {
        let head = if side == Sides::WHITE {
            Arena::WKING
        } else {
            Arena::BKING
        };
        PieceIter {
            board: self,
            next: self.arena[head as usize].next,
        }
    }

    /// Count non-pawn, non-king pieces for one side.
    pub fn heavy_and_minor_count(&self, side: Side) -> usize {
        self.side_pieces(side)
            .filter(|&idx| kind_of(self.rec(idx).piece) != Kinds::PAWN)
            .count()
    }

    /// Does this side have any piece besides king and pawns?
    pub fn has_pieces(&self, side: Side) -> bool {
        self.side_pieces(side)
            .any(|idx| kind_of(self.rec(idx).piece) != Kinds::PAWN)
    }

    /// The side has nothing but the bare king.
    pub fn lone_king(&self, side: Side) -> bool {
        let head = if side == Sides::WHITE {
            Arena::WKING
        } else {
            Arena::BKING
        };
        self.arena[head as usize].next == Arena::NONE
    }

    pub fn pawn_count(&self, side: Side) -> usize {
        self.side_pieces(side)
            .filter(|&idx| kind_of(self.rec(idx).piece) == Kinds::PAWN)
            .count()
    }

    /// Centipawn value of a piece type, zero for sentinels.
    pub fn piece_value(piece: Piece) -> i32 {
        match kind_of(piece) {
            Kinds::PAWN => PAWN_V,
            Kinds::KNIGHT => KNIGHT_V,
            Kinds::BISHOP => BISHOP_V,
            Kinds::ROOK => ROOK_V,
            Kinds::QUEEN => QUEEN_V,
            _ => 0,
        }
    }
}

// Private board functions (for initializing on startup).
impl Board {
    // Resets/wipes the board. Used by the FEN reader function.
    fn wipe(&mut self) {
        for sq in 0..NrOf::CELLS {
            self.cells[sq] = if defs::on_board(sq) {
                Arena::EMPTY
            } else {
                Arena::OFFBOARD
            };
        }
        self.arena = [PieceRec::empty(); NrOf::ARENA];
        self.arena[Arena::OFFBOARD as usize].piece = Pieces::EDGE;
        self.game_state = GameState::new();
        self.stack.clear();
        self.king_square = [0; Sides::BOTH];
    }

    // Main initialization function, called by the FEN reader after the
    // piece placement has landed in `cells`/`arena`: build the piece
    // lists, the king square cache, the material count, and the hashes.
    fn init(&mut self) {
        self.link_side(Sides::WHITE);
        self.link_side(Sides::BLACK);
        self.king_square[Sides::WHITE] = self.arena[Arena::WKING as usize].square;
        self.king_square[Sides::BLACK] = self.arena[Arena::BKING as usize].square;
        self.game_state.material = self.material_balance();
        let (pos, pawn) = self.compute_hashes();
        self.game_state.position_hash = pos;
        self.game_state.pawn_hash = pawn;
        self.stack.clear();
        self.stack.set_base(pos, pawn);
    }

    /// Index of the top stack entry; the distance from a remembered
    /// root index gives the current depth from the root.
    pub fn ply_index(&self) -> usize {
        self.stack.len() - 1
    }

    // Link one side's arena records into the king-headed list, in
    // descending piece value so the evaluation walks majors first.
    fn link_side(&mut self, side: Side) {
        let (first, last, king) = if side == Sides::WHITE {
            (Arena::WFIRST, Arena::WFIRST + 15, Arena::WKING)
        } else {
            (Arena::BFIRST, Arena::BFIRST + 15, Arena::BKING)
        };

        let mut order: Vec<u8> = (first..=last)
            .filter(|&i| i != king && self.arena[i as usize].square != 0)
            .collect();
        order.sort_by_key(|&i| -Self::piece_value(self.arena[i as usize].piece));

        self.arena[king as usize].prev = Arena::NONE;
        let mut tail = king;
        for idx in order {
            self.arena[tail as usize].next = idx;
            self.arena[idx as usize].prev = tail;
            tail = idx;
        }
        self.arena[tail as usize].next = Arena::NONE;
    }

    /// Raw material balance in centipawns, white positive.
    fn material_balance(&self) -> i32 {
        let mut material = 0;
        for side in [Sides::WHITE, Sides::BLACK] {
            let sign = if side == Sides::WHITE { 1 } else { -1 };
            for idx in self.side_pieces(side) {
                material += sign * Self::piece_value(self.rec(idx).piece);
            }
        }
        material
    }

    /// Full position and pawn hash from the piece lists and flags.
    pub(crate) fn compute_hashes(&self) -> (Hash, Hash) {
        let mut key: Hash = 0;
        let mut pawn_key: Hash = 0;

        for side in [Sides::WHITE, Sides::BLACK] {
            let king = self.king_square[side];
            let king_piece = if side == Sides::WHITE {
                Pieces::WKING
            } else {
                Pieces::BKING
            };
            key ^= self.zr.piece(king_piece, king);
            for idx in self.side_pieces(side) {
                let rec = self.rec(idx);
                let h = self.zr.piece(rec.piece, rec.square);
                key ^= h;
                if kind_of(rec.piece) == Kinds::PAWN {
                    pawn_key ^= h;
                }
            }
        }

        key ^= self.zr.castling(self.game_state.gflags);
        key ^= self.zr.side(self.game_state.side_to_move());
        key ^= self.zr.en_passant(self.game_state.en_passant);

        (key, pawn_key)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

// Cloning keeps the Zobrist randoms shared; they are read-only.
impl Clone for Board {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells,
            arena: self.arena,
            king_square: self.king_square,
            game_state: self.game_state,
            stack: self.stack.clone(),
            zr: Arc::clone(&self.zr),
        }
    }
}

pub struct PieceIter<'a> {
    board: &'a Board,
    next: u8,
}

impl<'a> Iterator for PieceIter<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.next == Arena::NONE {
            return None;
        }
        let current = self.next;
        self.next = self.board.arena[current as usize].next;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::defs::{Squares};
    use super::*;
    use crate::defs::FEN_START_POSITION;

    #[test]
    fn start_position_setup() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();

        assert_eq!(board.us(), Sides::WHITE);
        assert_eq!(board.king_square(Sides::WHITE), Squares::E1);
        assert_eq!(board.king_square(Sides::BLACK), Squares::E8);
        assert_eq!(board.piece_at(Squares::A1), Pieces::WROOK);
        assert_eq!(board.piece_at(Squares::D8), Pieces::BQUEEN);
        assert_eq!(board.piece_at(Squares::E4), Pieces::NONE);
        assert_eq!(board.piece_at(20), Pieces::EDGE);
        assert_eq!(board.game_state.material, 0);
        assert_eq!(board.pawn_count(Sides::WHITE), 8);
        assert_eq!(board.heavy_and_minor_count(Sides::BLACK), 7);
    }

    #[test]
    fn piece_lists_reach_all_pieces() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();

        for side in [Sides::WHITE, Sides::BLACK] {
            // 15 non-king pieces per side in the initial position.
            assert_eq!(board.side_pieces(side).count(), 15);
            for idx in board.side_pieces(side) {
                let rec = board.rec(idx);
                assert_ne!(rec.square, 0);
                assert_eq!(board.cells[rec.square], idx);
            }
        }
    }

    #[test]
    fn list_walks_majors_before_pawns() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();

        let first = board.side_pieces(Sides::WHITE).next().unwrap();
        assert_eq!(board.rec(first).piece, Pieces::WQUEEN);
    }

    #[test]
    fn hashes_differ_between_sides_to_move() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let white_hash = board.game_state.position_hash;

        board
            .fen_read(Some(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
            ))
            .unwrap();
        assert_ne!(white_hash, board.game_state.position_hash);
    }
}
