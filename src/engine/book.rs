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

// Opening book probe. The book is a binary blob of lines sorted by
// ascending position CRC-32:
//
//   CCCCLaAbB...
//
// CCCC is the CRC-32 big endian, L carries the move count in the low
// nibble and the CRC-8 high nibble in the high nibble. Each move is
// two bytes of 6-bit 8x8 squares; their two high bits carry the CRC-8
// low nibble as a second, independent verification. A sparse table of
// 2^9 buckets over the top CRC bits accelerates the lookup.

use super::defs::ErrFatal;
use crate::board::defs::{kind_of, to64, GFlags, Kinds, Pieces, BOARD64};
use crate::board::Board;
use crate::defs::{Piece, Sides};
use crate::misc::crc::{crc32, crc8};
use crate::movegen::defs::{Move, MoveList};
use if_chain::if_chain;

const BOOK_INDEX_BITS: u32 = 9;
const BOOK_SCAN_CRC_SHIFT: u32 = 32 - BOOK_INDEX_BITS;
const BOOK_BUCKETS: usize = 1 << BOOK_INDEX_BITS;
const MAX_LINE_MOVES: usize = 8;

/// 8x8 position snapshot handed to the checksums: 64 piece bytes plus
/// one status byte for side-to-move and castling rights.
pub type Snapshot = [u8; 65];

pub struct Book {
    data: Box<[u8]>,
    index: Box<[u32; BOOK_BUCKETS]>,
}

impl Book {
    /// Wrap a book blob; verifies the CRC sort order and builds the
    /// bucket index.
    pub fn from_bytes(data: &[u8]) -> Result<Self, &'static str> {
        let mut index = Box::new([u32::MAX; BOOK_BUCKETS]);
        let mut offset = 0usize;
        let mut last_crc = 0u32;
        while offset + 5 <= data.len() {
            let crc = read_crc32(&data[offset..]);
            if crc < last_crc {
                return Err(ErrFatal::BOOK_DATA);
            }
            last_crc = crc;
            let bucket = (crc >> BOOK_SCAN_CRC_SHIFT) as usize;
            if index[bucket] == u32::MAX {
                index[bucket] = offset as u32;
            }
            let moves = (data[offset + 4] & 0x0F) as usize;
            offset += 5 + 2 * moves;
        }
        if offset != data.len() {
            return Err(ErrFatal::BOOK_DATA);
        }
        // Fill empty buckets backwards so every probe has a start.
        let mut next = data.len() as u32;
        for bucket in (0..BOOK_BUCKETS).rev() {
            if index[bucket] == u32::MAX {
                index[bucket] = next;
            } else {
                next = index[bucket];
            }
        }
        Ok(Self {
            data: data.to_vec().into_boxed_slice(),
            index,
        })
    }

    /// Probe the book with the current position and, on a miss, with
    /// the vertically mirrored colour-swapped position. Candidates are
    /// validated against the legal move list; one of the surviving
    /// moves is picked via `random`. Returns None on a miss or when a
    /// candidate fails validation.
    pub fn probe(&self, board: &Board, legal: &MoveList, random: u32) -> Option<Move> {
        if let Some(candidates) = self.lookup_candidates(board, false) {
            return select_move(board, legal, &candidates, random, false);
        }
        if let Some(candidates) = self.lookup_candidates(board, true) {
            return select_move(board, legal, &candidates, random, true);
        }
        None
    }

    fn lookup_candidates(&self, board: &Board, mirrored: bool) -> Option<Vec<(u8, u8)>> {
        let snapshot = position_snapshot(board, mirrored);
        let line = self.find_line(&snapshot)?;
        let moves = (self.data[line + 4] & 0x0F) as usize;
        if moves == 0 || moves > MAX_LINE_MOVES {
            return None;
        }

        // Verify the CRC-8: high nibble in the length byte, low nibble
        // spread over the high bits of the first two move bytes.
        let expected = crc8(&snapshot);
        let hi = self.data[line + 4] & 0xF0;
        let lo = ((self.data[line + 5] >> 6) << 2) | (self.data[line + 6] >> 6);
        if hi | lo != expected {
            return None;
        }

        let mut candidates = Vec::with_capacity(moves);
        for m in 0..moves {
            let from = self.data[line + 5 + 2 * m] & 0x3F;
            let to = self.data[line + 6 + 2 * m] & 0x3F;
            candidates.push((from, to));
        }
        Some(candidates)
    }

    fn find_line(&self, snapshot: &Snapshot) -> Option<usize> {
        let target = crc32(snapshot);
        let mut offset = self.index[(target >> BOOK_SCAN_CRC_SHIFT) as usize] as usize;
        while offset + 5 <= self.data.len() {
            let crc = read_crc32(&self.data[offset..]);
            if crc == target {
                return Some(offset);
            }
            if crc > target {
                return None;
            }
            let moves = (self.data[offset + 4] & 0x0F) as usize;
            offset += 5 + 2 * moves;
        }
        None
    }
}

fn read_crc32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// Build the checksum snapshot of a position: 64 piece bytes (8x8
/// order, A1 first) and the status byte. With `mirrored`, the board is
/// flipped vertically and the colours are swapped; the castling rights
/// of the opponent are carried over verbatim, deliberately without
/// checking that they are legal for the mirrored piece placement.
pub fn position_snapshot(board: &Board, mirrored: bool) -> Snapshot {
    let mut snapshot = [0u8; 65];
    for i in 0..64 {
        let source = if mirrored { i ^ 56 } else { i };
        let mut piece = board.piece_at(BOARD64[source]);
        if mirrored && piece != Pieces::NONE {
            piece ^= 8;
        }
        snapshot[i] = piece as u8;
    }

    let gflags = board.game_state.gflags;
    let w_short = gflags & (GFlags::WKMOVED | GFlags::WRH1MOVED) == 0;
    let w_long = gflags & (GFlags::WKMOVED | GFlags::WRA1MOVED) == 0;
    let b_short = gflags & (GFlags::BKMOVED | GFlags::BRH8MOVED) == 0;
    let b_long = gflags & (GFlags::BKMOVED | GFlags::BRA8MOVED) == 0;
    let black_to_move = board.us() == Sides::BLACK;

    let mut status = 0u8;
    let (w_short, w_long, b_short, b_long, black_to_move) = if mirrored {
        (b_short, b_long, w_short, w_long, !black_to_move)
    } else {
        (w_short, w_long, b_short, b_long, black_to_move)
    };
    if black_to_move {
        status |= 1;
    }
    if w_short {
        status |= 1 << 1;
    }
    if w_long {
        status |= 1 << 2;
    }
    if b_short {
        status |= 1 << 3;
    }
    if b_long {
        status |= 1 << 4;
    }
    snapshot[64] = status;
    snapshot
}

// Match the candidates against the legal move list. Book moves carry
// no promotion suffix; a pawn reaching the last rank queens. En
// passant needs no special casing because the generated capture shares
// from and to with the book encoding.
fn select_move(
    board: &Board,
    legal: &MoveList,
    candidates: &[(u8, u8)],
    random: u32,
    mirrored: bool,
) -> Option<Move> {
    let mut playable: Vec<Move> = Vec::with_capacity(candidates.len());
    for &(mut from, mut to) in candidates {
        if mirrored {
            from ^= 56;
            to ^= 56;
        }
        let mut matched = None;
        for m in legal.iter() {
            if_chain! {
                if to64(m.from()) == from as usize;
                if to64(m.to()) == to as usize;
                // Suffix-less encoding: underpromotions never match.
                if !is_promotion(board.piece_at(m.from()), m.flag())
                    || kind_of(m.flag()) == Kinds::QUEEN;
                then {
                    matched = Some(*m);
                    break;
                }
            }
        }
        // One corrupt candidate disqualifies the whole line.
        playable.push(matched?);
    }
    if playable.is_empty() {
        return None;
    }
    Some(playable[random as usize % playable.len()])
}

fn is_promotion(mover: Piece, flag: usize) -> bool {
    kind_of(mover) == Kinds::PAWN && flag > 1 && kind_of(flag) != Kinds::PAWN
}

// ======================================================================
// Book building (host-side tooling and tests)
// ======================================================================

/// Serialize book lines into the binary blob format. Input: snapshots
/// with their candidate moves in 8x8 (from, to) pairs.
pub fn build_book(lines: &[(Snapshot, Vec<(u8, u8)>)]) -> Vec<u8> {
    let mut entries: Vec<(u32, u8, &Vec<(u8, u8)>)> = lines
        .iter()
        .map(|(snapshot, moves)| (crc32(snapshot), crc8(snapshot), moves))
        .collect();
    entries.sort_by_key(|e| e.0);

    let mut data = Vec::new();
    for (crc, crc8_val, moves) in entries {
        assert!(!moves.is_empty() && moves.len() <= MAX_LINE_MOVES);
        data.extend_from_slice(&crc.to_be_bytes());
        data.push((crc8_val & 0xF0) | moves.len() as u8);
        for (i, &(from, to)) in moves.iter().enumerate() {
            let mut from_byte = from & 0x3F;
            let mut to_byte = to & 0x3F;
            if i == 0 {
                // Spread the CRC-8 low nibble over the high bits.
                from_byte |= (crc8_val & 0x0C) << 4;
                to_byte |= (crc8_val & 0x03) << 6;
            }
            data.push(from_byte);
            data.push(to_byte);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::FEN_START_POSITION;
    use crate::movegen::MoveGenerator;

    fn sq64(name: &str) -> u8 {
        let bytes = name.as_bytes();
        ((bytes[1] - b'1') * 8 + (bytes[0] - b'a')) as u8
    }

    fn legal_moves(board: &mut Board) -> MoveList {
        let mg = MoveGenerator::new();
        let mut list = MoveList::new();
        let side = board.us();
        mg.generate_all(board, side, &mut list, true, None);
        let mut legal = MoveList::new();
        for i in 0..list.len() {
            let m = list.get(i);
            board.make(m);
            if !mg.king_in_check(board, side) {
                legal.push(m);
            }
            board.unmake();
        }
        legal
    }

    fn start_book(board: &Board) -> Book {
        let snapshot = position_snapshot(board, false);
        let lines = vec![(
            snapshot,
            vec![
                (sq64("e2"), sq64("e4")),
                (sq64("d2"), sq64("d4")),
                (sq64("g1"), sq64("f3")),
            ],
        )];
        Book::from_bytes(&build_book(&lines)).unwrap()
    }

    #[test]
    fn probe_hits_the_start_position() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let book = start_book(&board);
        let legal = legal_moves(&mut board);

        let chosen: Vec<String> = (0..6u32)
            .filter_map(|r| book.probe(&board, &legal, r))
            .map(|m| m.as_string())
            .collect();
        assert_eq!(chosen.len(), 6);
        assert_eq!(chosen[0], chosen[3]);
        let unique: std::collections::BTreeSet<&String> = chosen.iter().collect();
        assert_eq!(unique.len(), 3);
        for name in unique {
            assert!(["e2e4", "d2d4", "g1f3"].contains(&name.as_str()));
        }
    }

    #[test]
    fn probe_misses_other_positions() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let book = start_book(&board);

        board
            .fen_read(Some(
                "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            ))
            .unwrap();
        let legal = legal_moves(&mut board);
        assert!(book.probe(&board, &legal, 0).is_none());
    }

    #[test]
    fn corrupt_candidate_disqualifies_the_line() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let snapshot = position_snapshot(&board, false);
        // e2e5 is not a legal move; the line must be rejected entirely.
        let lines = vec![(
            snapshot,
            vec![(sq64("e2"), sq64("e4")), (sq64("e2"), sq64("e5"))],
        )];
        let book = Book::from_bytes(&build_book(&lines)).unwrap();
        let legal = legal_moves(&mut board);
        assert!(book.probe(&board, &legal, 0).is_none());
    }

    #[test]
    fn mirror_probe_finds_the_colour_swapped_line() {
        // Store only the white position 1.e4; after the sequence
        // 1.d3 e5, black's position mirrors it, so the mirror probe
        // must suggest the mirrored move e7e5 -> already played; use
        // 1.a3 as a tempo-neutral white opening instead:
        // after 1.a3, black mirrored equals white start shifted - keep
        // it simple and mirror the start position itself with black to
        // move via a null-ish FEN.
        let mut white_board = Board::new();
        white_board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let snapshot = position_snapshot(&white_board, false);
        let lines = vec![(snapshot, vec![(sq64("e2"), sq64("e4"))])];
        let book = Book::from_bytes(&build_book(&lines)).unwrap();

        // Start position with black to move is exactly the mirror
        // image of the stored line (castling rights carried verbatim).
        let mut black_board = Board::new();
        black_board
            .fen_read(Some(
                "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1",
            ))
            .unwrap();
        let legal = legal_moves(&mut black_board);
        let m = book
            .probe(&black_board, &legal, 0)
            .expect("mirror probe hit");
        assert_eq!(m.as_string(), "e7e5");
    }

    #[test]
    fn unsorted_book_data_is_rejected() {
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let a = position_snapshot(&board, false);
        board
            .fen_read(Some(
                "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            ))
            .unwrap();
        let b = position_snapshot(&board, false);

        let lines = vec![
            (a, vec![(sq64("e2"), sq64("e4"))]),
            (b, vec![(sq64("e7"), sq64("e5"))]),
        ];
        let blob = build_book(&lines);
        assert!(Book::from_bytes(&blob).is_ok());

        // Swapping the two lines breaks the sort order.
        let first_len = 5 + 2;
        let mut swapped = Vec::new();
        swapped.extend_from_slice(&blob[first_len..]);
        swapped.extend_from_slice(&blob[..first_len]);
        if crc32(&a) != crc32(&b) {
            assert!(Book::from_bytes(&swapped).is_err());
        }
    }
}
