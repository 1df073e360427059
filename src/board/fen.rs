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

use super::defs::{
    is_black, kind_of, Arena, GFlags, Kinds, Pieces, Squares, COL_NUM, ROW_NUM,
};
use super::Board;
use crate::defs::{Piece, Sides, Square, FEN_START_POSITION};
use crate::engine::defs::PositionError;
use crate::movegen::MoveGenerator;

const FEN_PARTS: usize = 4;
const LIST_OF_PIECES: &str = "kqrbnpKQRBNP";
const EP_SQUARES_WHITE: std::ops::RangeInclusive<Square> = Squares::A6..=Squares::H6;
const EP_SQUARES_BLACK: std::ops::RangeInclusive<Square> = Squares::A3..=Squares::H3;

#[derive(Debug, PartialEq)]
pub enum FenError {
    IncorrectLength,
    Part1,
    Part2,
    Part3,
    Part4,
    TooManyPieces,
}

impl std::fmt::Display for FenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let error = match self {
            Self::IncorrectLength => "Error in FEN string: must have at least 4 parts",
            Self::Part1 => "Error in FEN part 1: piece placement",
            Self::Part2 => "Error in FEN part 2: colors",
            Self::Part3 => "Error in FEN part 3: castling rights",
            Self::Part4 => "Error in FEN part 4: en passant field",
            Self::TooManyPieces => "Error in FEN string: too many pieces for one side",
        };
        write!(f, "{error}")
    }
}

pub type FenResult = Result<(), FenError>;

impl Board {
    // Reads a position into the board; None sets up the starting
    // position. On any error the board is left unchanged.
    pub fn fen_read(&mut self, fen_string: Option<&str>) -> FenResult {
        let fen = fen_string.unwrap_or(FEN_START_POSITION);
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < FEN_PARTS {
            return Err(FenError::IncorrectLength);
        }

        let mut try_board = self.clone();
        try_board.wipe_for_fen();
        try_board.read_pieces(parts[0])?;
        try_board.read_color(parts[1])?;
        try_board.read_castling(parts[2])?;
        try_board.read_en_passant(parts[3])?;
        if parts.len() > 4 {
            if let Ok(fifty) = parts[4].parse::<u16>() {
                try_board.game_state.fifty_moves = fifty;
            }
        }
        if parts.len() > 5 {
            if let Ok(moves) = parts[5].parse::<u16>() {
                try_board.game_state.move_number = moves;
            }
        }

        try_board.finish_fen();
        *self = try_board;
        Ok(())
    }

    fn wipe_for_fen(&mut self) {
        // Keep the shared Zobrist randoms, drop everything else.
        let zr = std::sync::Arc::clone(&self.zr);
        *self = Board::new();
        self.zr = zr;
    }

    fn finish_fen(&mut self) {
        self.init();
    }

    fn read_pieces(&mut self, part: &str) -> FenResult {
        let mut rank = 8usize;
        let mut file = 1usize;
        let mut next_white = Arena::WKING + 1;
        let mut next_black = Arena::BKING + 1;

        for c in part.chars() {
            match c {
                '/' => {
                    if file != 9 || rank == 1 {
                        return Err(FenError::Part1);
                    }
                    rank -= 1;
                    file = 1;
                }
                '1'..='8' => {
                    file += c as usize - '0' as usize;
                }
                _ if LIST_OF_PIECES.contains(c) => {
                    if file > 8 {
                        return Err(FenError::Part1);
                    }
                    let piece = char_to_piece(c);
                    let square = 11 + rank * 10 + file;
                    let index = match piece {
                        Pieces::WKING => {
                            if self.arena[Arena::WKING as usize].square != 0 {
                                return Err(FenError::Part1);
                            }
                            Arena::WKING
                        }
                        Pieces::BKING => {
                            if self.arena[Arena::BKING as usize].square != 0 {
                                return Err(FenError::Part1);
                            }
                            Arena::BKING
                        }
                        _ if is_black(piece) => {
                            if next_black > Arena::BFIRST + 15 {
                                return Err(FenError::TooManyPieces);
                            }
                            let i = next_black;
                            next_black += 1;
                            i
                        }
                        _ => {
                            if next_white > Arena::WFIRST + 15 {
                                return Err(FenError::TooManyPieces);
                            }
                            let i = next_white;
                            next_white += 1;
                            i
                        }
                    };
                    self.arena[index as usize].piece = piece;
                    self.arena[index as usize].square = square;
                    self.cells[square] = index;
                    file += 1;
                }
                _ => return Err(FenError::Part1),
            }
        }

        // Both kings must be on the board.
        if self.arena[Arena::WKING as usize].square == 0
            || self.arena[Arena::BKING as usize].square == 0
        {
            return Err(FenError::Part1);
        }
        Ok(())
    }

    fn read_color(&mut self, part: &str) -> FenResult {
        match part {
            "w" => self.game_state.active_color = Sides::WHITE as u8,
            "b" => self.game_state.active_color = Sides::BLACK as u8,
            _ => return Err(FenError::Part2),
        }
        Ok(())
    }

    // Castling rights come in as availability; the board tracks them as
    // moved flags, so absent rights set the respective flags.
    fn read_castling(&mut self, part: &str) -> FenResult {
        let mut gflags = GFlags::WRA1MOVED | GFlags::WRH1MOVED | GFlags::BRA8MOVED
            | GFlags::BRH8MOVED;

        if part != "-" {
            for c in part.chars() {
                match c {
                    'K' => gflags &= !GFlags::WRH1MOVED,
                    'Q' => gflags &= !GFlags::WRA1MOVED,
                    'k' => gflags &= !GFlags::BRH8MOVED,
                    'q' => gflags &= !GFlags::BRA8MOVED,
                    _ => return Err(FenError::Part3),
                }
            }
        }

        // No castling right on either wing implies the king moved; a
        // displaced king cannot have rights either.
        if gflags & (GFlags::WRA1MOVED | GFlags::WRH1MOVED)
            == (GFlags::WRA1MOVED | GFlags::WRH1MOVED)
            || self.arena[Arena::WKING as usize].square != Squares::E1
        {
            gflags |= GFlags::WKMOVED | GFlags::WRA1MOVED | GFlags::WRH1MOVED;
        }
        if gflags & (GFlags::BRA8MOVED | GFlags::BRH8MOVED)
            == (GFlags::BRA8MOVED | GFlags::BRH8MOVED)
            || self.arena[Arena::BKING as usize].square != Squares::E8
        {
            gflags |= GFlags::BKMOVED | GFlags::BRA8MOVED | GFlags::BRH8MOVED;
        }
        if self.game_state.active_color == Sides::BLACK as u8 {
            gflags |= GFlags::BLACK_MOVED;
        }

        self.game_state.gflags = gflags;
        Ok(())
    }

    fn read_en_passant(&mut self, part: &str) -> FenResult {
        if part == "-" {
            self.game_state.en_passant = 0;
            return Ok(());
        }
        let bytes = part.as_bytes();
        if bytes.len() != 2 {
            return Err(FenError::Part4);
        }
        let file = (bytes[0] as i32 - 'a' as i32 + 1) as usize;
        let rank = (bytes[1] as i32 - '0' as i32) as usize;
        if !(1..=8).contains(&file) || !(1..=8).contains(&rank) {
            return Err(FenError::Part4);
        }
        let square = 11 + rank * 10 + file;
        let valid = if self.game_state.active_color == Sides::WHITE as u8 {
            EP_SQUARES_WHITE.contains(&square)
        } else {
            EP_SQUARES_BLACK.contains(&square)
        };
        if !valid {
            return Err(FenError::Part4);
        }
        self.game_state.en_passant = square;
        Ok(())
    }
}

fn char_to_piece(c: char) -> Piece {
    match c {
        'K' => Pieces::WKING,
        'Q' => Pieces::WQUEEN,
        'R' => Pieces::WROOK,
        'B' => Pieces::WBISHOP,
        'N' => Pieces::WKNIGHT,
        'P' => Pieces::WPAWN,
        'k' => Pieces::BKING,
        'q' => Pieces::BQUEEN,
        'r' => Pieces::BROOK,
        'b' => Pieces::BBISHOP,
        'n' => Pieces::BKNIGHT,
        'p' => Pieces::BPAWN,
        _ => Pieces::NONE,
    }
}

// Position editor checks, beyond what the FEN reader enforces. The
// caller decides how to display the reason code.
impl Board {
    pub fn validate_position(&self, mg: &MoveGenerator) -> Result<(), PositionError> {
        for side in [Sides::WHITE, Sides::BLACK] {
            if self.side_pieces(side).count() > 15 {
                return Err(PositionError::TooManyPieces);
            }
            if self.pawn_count(side) > 8 {
                return Err(PositionError::TooManyPieces);
            }
        }

        // Kings may not touch, and pawns may not stand on promotion ranks.
        let wk = self.king_square(Sides::WHITE);
        let bk = self.king_square(Sides::BLACK);
        let row_diff = (ROW_NUM[wk] as i32 - ROW_NUM[bk] as i32).abs();
        let col_diff = (COL_NUM[wk] as i32 - COL_NUM[bk] as i32).abs();
        if row_diff <= 1 && col_diff <= 1 {
            return Err(PositionError::KingInvalid);
        }
        for side in [Sides::WHITE, Sides::BLACK] {
            for idx in self.side_pieces(side) {
                let rec = self.rec(idx);
                if kind_of(rec.piece) == Kinds::PAWN {
                    let rank = ROW_NUM[rec.square];
                    if rank == 1 || rank == 8 {
                        return Err(PositionError::KingInvalid);
                    }
                }
            }
        }

        // The side not to move must not be in check.
        if mg.king_in_check(self, self.opponent()) {
            return Err(PositionError::ChecksInvalid);
        }
        // At most two pieces can legally give check at once.
        if mg.count_attackers(self, self.opponent(), self.king_square(self.us())) > 2 {
            return Err(PositionError::TooManyChecks);
        }

        // Promotion accounting: extra majors/minors must come out of the
        // eight pawns of the side.
        for side in [Sides::WHITE, Sides::BLACK] {
            let mut counts = [0usize; 8];
            for idx in self.side_pieces(side) {
                counts[kind_of(self.rec(idx).piece)] += 1;
            }
            let promoted = counts[Kinds::QUEEN].saturating_sub(1)
                + counts[Kinds::ROOK].saturating_sub(2)
                + counts[Kinds::BISHOP].saturating_sub(2)
                + counts[Kinds::KNIGHT].saturating_sub(2);
            if counts[Kinds::PAWN] + promoted > 8 {
                return Err(PositionError::TooManyMoves);
            }

            // Doubled pawns imply captures; the opponent must be missing
            // at least that many men.
            let mut per_file = [0usize; 9];
            for idx in self.side_pieces(side) {
                let rec = self.rec(idx);
                if kind_of(rec.piece) == Kinds::PAWN {
                    per_file[COL_NUM[rec.square]] += 1;
                }
            }
            let implied_captures: usize =
                per_file.iter().map(|&n| n.saturating_sub(1)).sum();
            let enemy_missing = 15 - self.side_pieces(side ^ 1).count();
            if implied_captures > enemy_missing {
                return Err(PositionError::TooManyCapts);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_fen() {
        let mut board = Board::new();
        assert_eq!(board.fen_read(Some("foo")), Err(FenError::IncorrectLength));
        assert_eq!(
            board.fen_read(Some("8/8/8/8/8/8/8/8 w - - 0 1")),
            Err(FenError::Part1)
        );
        assert_eq!(
            board.fen_read(Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1")),
            Err(FenError::Part2)
        );
    }

    #[test]
    fn error_leaves_board_unchanged() {
        let mut board = Board::new();
        board.fen_read(None).unwrap();
        let before = board.game_state;
        assert!(board.fen_read(Some("junk")).is_err());
        assert_eq!(board.game_state, before);
    }

    #[test]
    fn castling_rights_map_to_moved_flags() {
        let mut board = Board::new();
        board
            .fen_read(Some(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w Kq - 0 1",
            ))
            .unwrap();
        let gflags = board.game_state.gflags;
        assert_eq!(gflags & GFlags::WRH1MOVED, 0);
        assert_ne!(gflags & GFlags::WRA1MOVED, 0);
        assert_eq!(gflags & GFlags::BRA8MOVED, 0);
        assert_ne!(gflags & GFlags::BRH8MOVED, 0);
        assert_eq!(gflags & GFlags::WKMOVED, 0);
        assert_eq!(gflags & GFlags::BKMOVED, 0);
    }

    #[test]
    fn displaced_king_loses_rights() {
        let mut board = Board::new();
        board
            .fen_read(Some(
                "rnbq1bnr/ppppkppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQ - 0 3",
            ))
            .unwrap();
        assert_ne!(board.game_state.gflags & GFlags::BKMOVED, 0);
        assert_eq!(board.game_state.gflags & GFlags::WKMOVED, 0);
    }

    #[test]
    fn en_passant_square_is_checked_for_side() {
        let mut board = Board::new();
        assert!(board
            .fen_read(Some(
                "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq e6 0 2",
            ))
            .is_ok());
        assert_eq!(board.game_state.en_passant, Squares::E6);
        assert!(board
            .fen_read(Some(
                "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq e3 0 2",
            ))
            .is_err());
    }

    #[test]
    fn editor_rejects_touching_kings() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board.fen_read(Some("8/8/8/3kK3/8/8/8/8 w - - 0 1")).unwrap();
        assert_eq!(
            board.validate_position(&mg),
            Err(PositionError::KingInvalid)
        );
    }

    #[test]
    fn editor_rejects_opponent_in_check() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board
            .fen_read(Some("4k3/8/8/8/8/8/4R3/4K3 b - - 0 1"))
            .unwrap();
        // Black to move and black in check is fine; white to move with
        // black in check is not.
        assert!(board.validate_position(&mg).is_ok());
        board
            .fen_read(Some("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1"))
            .unwrap();
        assert_eq!(
            board.validate_position(&mg),
            Err(PositionError::ChecksInvalid)
        );
    }

    #[test]
    fn editor_rejects_impossible_promotions() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        // Nine queens plus eight pawns cannot happen.
        board
            .fen_read(Some("QQQQQQQQ/QPPPPPPP/1P6/8/8/2k5/8/K7 w - - 0 1"))
            .unwrap();
        assert_eq!(
            board.validate_position(&mg),
            Err(PositionError::TooManyMoves)
        );
    }
}
