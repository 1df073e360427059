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

use super::defs::{is_black, kind_of, Arena, GFlags, Kinds, Pieces, Squares};
use super::stack::{Special, StackEntry};
use super::Board;
use crate::defs::{Sides, Square, PAWN_V};
use crate::movegen::defs::Move;

impl Board {
    // Applies a pseudo-legal move. Legality with respect to leaving the
    // own king in check is NOT verified here; the search makes the move
    // and asks the generator afterwards.
    pub fn make(&mut self, m: Move) {
        let prev_state = self.game_state;
        let from = m.from();
        let to = m.to();
        let flag = m.flag();
        let mover = self.cells[from];
        let ptype = self.arena[mover as usize].piece;

        let mut capt_sq = to;
        let mut special = Special::Normal;
        self.game_state.en_passant = 0;

        match ptype {
            Pieces::WPAWN => {
                let diff = to as isize - from as isize;
                if (diff == 11 || diff == 9) && self.cells[to] == Arena::EMPTY {
                    // En passant: the victim stands below the target.
                    capt_sq = to - 10;
                } else {
                    if (Pieces::WKNIGHT..Pieces::WKING).contains(&flag) {
                        // Promotion, promoted piece kind in the flag.
                        self.arena[mover as usize].piece = flag;
                        special = Special::Promotion;
                        self.game_state.material += Self::piece_value(flag) - PAWN_V;
                    }
                    if diff == 20
                        && (self.piece_at(to + 1) == Pieces::BPAWN
                            || self.piece_at(to - 1) == Pieces::BPAWN)
                    {
                        self.game_state.en_passant = from + 10;
                    }
                }
            }
            Pieces::BPAWN => {
                let diff = to as isize - from as isize;
                if (diff == -11 || diff == -9) && self.cells[to] == Arena::EMPTY {
                    capt_sq = to + 10;
                } else {
                    if (Pieces::BKNIGHT..Pieces::BKING).contains(&flag) {
                        self.arena[mover as usize].piece = flag;
                        special = Special::Promotion;
                        self.game_state.material -= Self::piece_value(flag) - PAWN_V;
                    }
                    if diff == -20
                        && (self.piece_at(to + 1) == Pieces::WPAWN
                            || self.piece_at(to - 1) == Pieces::WPAWN)
                    {
                        self.game_state.en_passant = from - 10;
                    }
                }
            }
            _ => {}
        }

        // Captured piece record: unlink from its side list, keep the
        // links inside the record for the exact relink on unmake.
        let captured = self.cells[capt_sq];
        if captured != Arena::EMPTY {
            let victim = self.arena[captured as usize].piece;
            let sign = if is_black(victim) { -1 } else { 1 };
            self.game_state.material -= sign * Self::piece_value(victim);
            self.unlink(captured);
            self.cells[capt_sq] = Arena::EMPTY;
        }

        // Move the piece record.
        self.arena[mover as usize].square = to;
        self.cells[to] = mover;
        self.cells[from] = Arena::EMPTY;

        // Update the flag word.
        if is_black(ptype) {
            self.game_state.gflags |= GFlags::BLACK_MOVED;
            if ptype == Pieces::BROOK {
                if from == Squares::A8 {
                    self.game_state.gflags |= GFlags::BRA8MOVED;
                    if self.game_state.gflags & GFlags::BRH8MOVED != 0 {
                        self.game_state.gflags |= GFlags::BKMOVED;
                    }
                } else if from == Squares::H8 {
                    self.game_state.gflags |= GFlags::BRH8MOVED;
                    if self.game_state.gflags & GFlags::BRA8MOVED != 0 {
                        self.game_state.gflags |= GFlags::BKMOVED;
                    }
                }
            } else if ptype == Pieces::BKING {
                self.king_square[Sides::BLACK] = to;
                if from == Squares::E8 {
                    self.game_state.gflags |=
                        GFlags::BKMOVED | GFlags::BRA8MOVED | GFlags::BRH8MOVED;
                    if to == Squares::G8 {
                        self.move_castling_rook(Squares::H8, Squares::F8);
                        special = Special::Castle;
                        self.game_state.gflags |= GFlags::BCASTLED;
                    } else if to == Squares::C8 {
                        self.move_castling_rook(Squares::A8, Squares::D8);
                        special = Special::Castle;
                        self.game_state.gflags |= GFlags::BCASTLED;
                    }
                } else {
                    self.game_state.gflags |=
                        GFlags::BKMOVED | GFlags::BRA8MOVED | GFlags::BRH8MOVED;
                }
                if to == Squares::G8
                    && self.piece_at(Squares::F8) == Pieces::BROOK
                    && self.cells[Squares::H8] == Arena::EMPTY
                {
                    // Castling by hand still counts for the king safety.
                    self.game_state.gflags |= GFlags::BCASTLED;
                }
            }
        } else {
            self.game_state.gflags &= !GFlags::BLACK_MOVED;
            if ptype == Pieces::WROOK {
                if from == Squares::A1 {
                    self.game_state.gflags |= GFlags::WRA1MOVED;
                    if self.game_state.gflags & GFlags::WRH1MOVED != 0 {
                        self.game_state.gflags |= GFlags::WKMOVED;
                    }
                } else if from == Squares::H1 {
                    self.game_state.gflags |= GFlags::WRH1MOVED;
                    if self.game_state.gflags & GFlags::WRA1MOVED != 0 {
                        self.game_state.gflags |= GFlags::WKMOVED;
                    }
                }
            } else if ptype == Pieces::WKING {
                self.king_square[Sides::WHITE] = to;
                self.game_state.gflags |=
                    GFlags::WKMOVED | GFlags::WRA1MOVED | GFlags::WRH1MOVED;
                if from == Squares::E1 {
                    if to == Squares::G1 {
                        self.move_castling_rook(Squares::H1, Squares::F1);
                        special = Special::Castle;
                        self.game_state.gflags |= GFlags::WCASTLED;
                    } else if to == Squares::C1 {
                        self.move_castling_rook(Squares::A1, Squares::D1);
                        special = Special::Castle;
                        self.game_state.gflags |= GFlags::WCASTLED;
                    }
                }
                if to == Squares::G1
                    && self.piece_at(Squares::F1) == Pieces::WROOK
                    && self.cells[Squares::H1] == Arena::EMPTY
                {
                    self.game_state.gflags |= GFlags::WCASTLED;
                }
            }
        }

        // Fifty-move counter and move number.
        if kind_of(ptype) == Kinds::PAWN || captured != Arena::EMPTY {
            self.game_state.fifty_moves = 0;
        } else {
            self.game_state.fifty_moves += 1;
        }
        if is_black(ptype) {
            self.game_state.move_number += 1;
        }
        self.game_state.active_color ^= 1;

        let (pos_hash, pawn_hash) = self.compute_hashes();
        self.game_state.position_hash = pos_hash;
        self.game_state.pawn_hash = pawn_hash;

        self.stack.push(StackEntry {
            mv: m,
            captured,
            capt_sq,
            special,
            pos_hash,
            pawn_hash,
            prev_state,
        });
    }

    // Exact inverse of make, in reverse order.
    pub fn unmake(&mut self) {
        let entry = self.stack.pop();
        let m = entry.mv;
        let from = m.from();
        let to = m.to();
        let mover = self.cells[to];

        if entry.special == Special::Promotion {
            // Restore the pawn the promoted piece came from.
            self.arena[mover as usize].piece = if is_black(self.arena[mover as usize].piece) {
                Pieces::BPAWN
            } else {
                Pieces::WPAWN
            };
        }

        self.arena[mover as usize].square = from;
        self.cells[from] = mover;
        self.cells[to] = Arena::EMPTY;

        if kind_of(self.arena[mover as usize].piece) == Kinds::KING {
            let side = if is_black(self.arena[mover as usize].piece) {
                Sides::BLACK
            } else {
                Sides::WHITE
            };
            self.king_square[side] = from;
            if entry.special == Special::Castle {
                match to {
                    Squares::G1 => self.move_castling_rook(Squares::F1, Squares::H1),
                    Squares::C1 => self.move_castling_rook(Squares::D1, Squares::A1),
                    Squares::G8 => self.move_castling_rook(Squares::F8, Squares::H8),
                    Squares::C8 => self.move_castling_rook(Squares::D8, Squares::A8),
                    _ => {}
                }
            }
        }

        if entry.captured != Arena::EMPTY {
            self.relink(entry.captured);
            self.arena[entry.captured as usize].square = entry.capt_sq;
            self.cells[entry.capt_sq] = entry.captured;
        }

        self.game_state = entry.prev_state;
    }

    /// The side to move passes. No stack entry is pushed; the caller
    /// keeps the returned state and hands it back to unmake_null.
    pub fn make_null(&mut self) -> crate::board::GameState {
        let saved = self.game_state;
        self.game_state.en_passant = 0;
        self.game_state.active_color ^= 1;
        let (pos_hash, pawn_hash) = self.compute_hashes();
        self.game_state.position_hash = pos_hash;
        self.game_state.pawn_hash = pawn_hash;
        saved
    }

    pub fn unmake_null(&mut self, saved: crate::board::GameState) {
        self.game_state = saved;
    }

    fn move_castling_rook(&mut self, from: Square, to: Square) {
        let rook = self.cells[from];
        self.arena[rook as usize].square = to;
        self.cells[to] = rook;
        self.cells[from] = Arena::EMPTY;
    }

    fn unlink(&mut self, index: u8) {
        let rec = self.arena[index as usize];
        self.arena[rec.prev as usize].next = rec.next;
        if rec.next != Arena::NONE {
            self.arena[rec.next as usize].prev = rec.prev;
        }
        self.arena[index as usize].square = 0;
    }

    // Relies on strictly LIFO capture/restore order: the neighbours
    // recorded in the captured record are exactly the current ones.
    fn relink(&mut self, index: u8) {
        let rec = self.arena[index as usize];
        self.arena[rec.prev as usize].next = index;
        if rec.next != Arena::NONE {
            self.arena[rec.next as usize].prev = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::FEN_START_POSITION;
    use crate::movegen::defs::MoveFlags;

    fn snapshot(board: &Board) -> (Vec<u8>, Vec<crate::board::PieceRec>, crate::board::GameState) {
        (
            board.cells.to_vec(),
            board.arena.to_vec(),
            board.game_state,
        )
    }

    fn assert_identity(fen: &str, mv: Move) {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let before = snapshot(&board);
        board.make(mv);
        board.unmake();
        let after = snapshot(&board);
        assert_eq!(before.0, after.0, "cells differ after unmake");
        assert_eq!(before.1, after.1, "arena differs after unmake");
        assert_eq!(before.2, after.2, "game state differs after unmake");
    }

    #[test]
    fn make_unmake_is_identity_for_quiet_move() {
        assert_identity(
            FEN_START_POSITION,
            Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 0),
        );
    }

    #[test]
    fn make_unmake_is_identity_for_double_push_and_capture() {
        assert_identity(
            FEN_START_POSITION,
            Move::new(Squares::E2, Squares::E4, Pieces::WPAWN, 0),
        );
        assert_identity(
            "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2",
            Move::new(Squares::E4, Squares::D5, Pieces::WPAWN, 0),
        );
    }

    #[test]
    fn make_unmake_is_identity_for_en_passant() {
        assert_identity(
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            Move::new(Squares::E5, Squares::F6, Pieces::WPAWN, 0),
        );
    }

    #[test]
    fn make_unmake_is_identity_for_castling() {
        assert_identity(
            "r3k2r/pppqppbp/2np1np1/8/8/2NP1NP1/PPPQPPBP/R3K2R w KQkq - 0 1",
            Move::new(Squares::E1, Squares::G1, MoveFlags::NORMAL, 0),
        );
        assert_identity(
            "r3k2r/pppqppbp/2np1np1/8/8/2NP1NP1/PPPQPPBP/R3K2R b KQkq - 0 1",
            Move::new(Squares::E8, Squares::C8, MoveFlags::NORMAL, 0),
        );
    }

    #[test]
    fn make_unmake_is_identity_for_promotion_with_capture() {
        assert_identity(
            "rn1qkbnr/pPpppppp/8/8/8/8/P1PPPPPP/RNBQKBNR w KQkq - 0 5",
            Move::new(Squares::B7, Squares::A8, Pieces::WQUEEN, 0),
        );
    }

    #[test]
    fn en_passant_capture_removes_the_right_pawn() {
        let mut board = Board::new();
        board
            .fen_read(Some(
                "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            ))
            .unwrap();
        board.make(Move::new(Squares::E5, Squares::F6, Pieces::WPAWN, 0));
        assert_eq!(board.piece_at(Squares::F6), Pieces::WPAWN);
        assert_eq!(board.piece_at(Squares::F5), Pieces::NONE);
        assert_eq!(board.pawn_count(Sides::BLACK), 7);
    }

    #[test]
    fn double_push_sets_ep_square_only_next_to_enemy_pawn() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        board.make(Move::new(Squares::E2, Squares::E4, Pieces::WPAWN, 0));
        // No black pawn adjacent to e4, so no en-passant square.
        assert_eq!(board.game_state.en_passant, 0);
        board.unmake();

        board
            .fen_read(Some(
                "rnbqkbnr/pppp1ppp/8/8/4p3/8/PPPPPPPP/RNBQKBNR w KQkq - 0 3",
            ))
            .unwrap();
        board.make(Move::new(Squares::D2, Squares::D4, Pieces::WPAWN, 0));
        assert_eq!(board.game_state.en_passant, Squares::D3);
    }

    #[test]
    fn castling_moves_the_rook_and_sets_flags() {
        let mut board = Board::new();
        board
            .fen_read(Some(
                "r3k2r/pppqppbp/2np1np1/8/8/2NP1NP1/PPPQPPBP/R3K2R w KQkq - 0 1",
            ))
            .unwrap();
        board.make(Move::new(Squares::E1, Squares::G1, MoveFlags::NORMAL, 0));
        assert_eq!(board.piece_at(Squares::G1), Pieces::WKING);
        assert_eq!(board.piece_at(Squares::F1), Pieces::WROOK);
        assert_eq!(board.piece_at(Squares::H1), Pieces::NONE);
        assert_ne!(board.game_state.gflags & GFlags::WCASTLED, 0);
        assert_eq!(board.king_square(Sides::WHITE), Squares::G1);
    }

    #[test]
    fn both_rooks_moved_implies_king_moved() {
        let mut board = Board::new();
        board
            .fen_read(Some(
                "r3k2r/pppqppbp/2np1np1/8/8/2NP1NP1/PPPQPPBP/R3K2R w KQkq - 0 1",
            ))
            .unwrap();
        board.make(Move::new(Squares::A1, Squares::B1, MoveFlags::NORMAL, 0));
        assert_eq!(board.game_state.gflags & GFlags::WKMOVED, 0);
        board.make(Move::new(Squares::A8, Squares::B8, MoveFlags::NORMAL, 0));
        board.make(Move::new(Squares::H1, Squares::G1, MoveFlags::NORMAL, 0));
        assert_ne!(board.game_state.gflags & GFlags::WKMOVED, 0);
    }

    #[test]
    fn hash_restored_after_make_unmake_chain() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let hash = board.game_state.position_hash;
        let pawn_hash = board.game_state.pawn_hash;

        let moves = [
            Move::new(Squares::E2, Squares::E4, Pieces::WPAWN, 0),
            Move::new(Squares::E7, Squares::E5, Pieces::BPAWN, 0),
            Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 0),
            Move::new(Squares::B8, Squares::C6, MoveFlags::NORMAL, 0),
        ];
        for m in moves {
            board.make(m);
        }
        for _ in &moves {
            board.unmake();
        }
        assert_eq!(board.game_state.position_hash, hash);
        assert_eq!(board.game_state.pawn_hash, pawn_hash);
    }

    #[test]
    fn fifty_move_counter_resets_on_pawn_moves_and_captures() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        board.make(Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 0));
        assert_eq!(board.game_state.fifty_moves, 1);
        board.make(Move::new(Squares::E7, Squares::E5, Pieces::BPAWN, 0));
        assert_eq!(board.game_state.fifty_moves, 0);
    }
}
