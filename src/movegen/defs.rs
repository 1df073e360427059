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

use crate::board::defs::{square_name, to64, BOARD64};
use crate::defs::{Piece, Square, MAX_LEGAL_MOVES};

// Move ordering scores, kept in the high byte of the move word. The
// values above TACTICAL are reserved: principal variation, hash move,
// mate in one, threat move from the null search, killers, and the
// fifty-move handling at the root. Everything capture-or-promotion
// scores between TACTICAL and the reserved band; quiet moves stay
// below TACTICAL.
pub struct OrderVal;
impl OrderVal {
    pub const ILLEGAL: u8 = 0;
    pub const QUIET: u8 = 4;
    pub const TACTICAL: u8 = 128;
    pub const CHECK: u8 = 220;
    pub const FIFTY_MOVES: u8 = 226;
    pub const KILLER_1: u8 = 228;
    pub const KILLER_0: u8 = 230;
    pub const THREAT: u8 = 235;
    pub const MATE_1: u8 = 240;
    pub const HASH: u8 = 245;
    pub const PV: u8 = 250;
}

/// Victim/attacker pre-sort score for a capture or promotion.
/// `victim` and `attacker` are piece kinds (2..=6 and 2..=7).
pub fn mvv_lva(victim: Piece, attacker: Piece) -> u8 {
    (OrderVal::TACTICAL as usize + victim * 12 - attacker) as u8
}

// A move packs into 32 bits: from:8, to:8, flag:8, order:8. The flag
// is 0 for an illegal placeholder, 1 for a normal move, the moving
// pawn kind for a non-promoting pawn move, or the promoted piece kind
// for a promotion. The order byte is the pre-sort score and carries no
// meaning once the move has been made.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Move {
    data: u32,
}

pub struct MoveFlags;
impl MoveFlags {
    pub const ILLEGAL: usize = 0;
    pub const NORMAL: usize = 1;
}

const MOVE_MASK: u32 = 0x00FF_FFFF;

impl Move {
    pub const NONE: Move = Move { data: 0 };

    pub fn new(from: Square, to: Square, flag: usize, order: u8) -> Self {
        Self {
            data: (from as u32) | ((to as u32) << 8) | ((flag as u32) << 16) | ((order as u32) << 24),
        }
    }

    pub fn from(self) -> Square {
        (self.data & 0xFF) as Square
    }

    pub fn to(self) -> Square {
        ((self.data >> 8) & 0xFF) as Square
    }

    pub fn flag(self) -> usize {
        ((self.data >> 16) & 0xFF) as usize
    }

    pub fn order(self) -> u8 {
        (self.data >> 24) as u8
    }

    pub fn set_order(&mut self, order: u8) {
        self.data = (self.data & MOVE_MASK) | ((order as u32) << 24);
    }

    pub fn is_none(self) -> bool {
        self.data & MOVE_MASK == 0
    }

    /// Compare from/to/flag, ignoring the sort byte.
    pub fn same_move(self, other: Move) -> bool {
        (self.data ^ other.data) & MOVE_MASK == 0
    }

    pub fn compress(self) -> CMove {
        CMove::from_move(self)
    }

    pub fn as_string(self) -> String {
        if self.is_none() {
            return String::from("0000");
        }
        let mut s = format!("{}{}", square_name(self.from()), square_name(self.to()));
        // Promotion suffix: flag carries the promoted piece kind.
        let promo = match self.flag() & 7 {
            3 => "n",
            4 => "b",
            5 => "r",
            6 => "q",
            _ => "",
        };
        // Pawn flags use the same kind encoding; only a promotion has a
        // kind other than pawn in the flag.
        if self.flag() > 1 && (self.flag() & 7) != 2 {
            s.push_str(promo);
        }
        s
    }
}

// A compressed move fits killer slots, PV lines, and hash entries:
// from64:6, to64:6, flag-nibble:4. The flag nibble maps the 8-bit flag
// into four bits: white values 0..=7 stay, black piece kinds 10..=15
// map down to 8..=13.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CMove {
    data: u16,
}

impl CMove {
    pub const NONE: CMove = CMove { data: 0 };

    pub fn from_move(m: Move) -> Self {
        if m.is_none() {
            return Self::NONE;
        }
        let flag = m.flag();
        let nibble = if flag >= 10 { flag - 2 } else { flag } as u16;
        Self {
            data: (to64(m.from()) as u16) | ((to64(m.to()) as u16) << 6) | (nibble << 12),
        }
    }

    pub fn decompress(self) -> Move {
        if self.data == 0 {
            return Move::NONE;
        }
        let from = BOARD64[(self.data & 0x3F) as usize];
        let to = BOARD64[((self.data >> 6) & 0x3F) as usize];
        let nibble = (self.data >> 12) as usize;
        let flag = if nibble >= 8 { nibble + 2 } else { nibble };
        Move::new(from, to, flag, 0)
    }

    pub fn is_none(self) -> bool {
        self.data == 0
    }

    /// Raw 16-bit value, for serialization.
    pub fn raw(self) -> u16 {
        self.data
    }

    pub fn from_raw(data: u16) -> Self {
        Self { data }
    }
}

// Fixed-capacity move list; no allocation during search.
#[derive(Clone)]
pub struct MoveList {
    list: [Move; MAX_LEGAL_MOVES],
    count: usize,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            list: [Move::NONE; MAX_LEGAL_MOVES],
            count: 0,
        }
    }

    pub fn push(&mut self, m: Move) {
        self.list[self.count] = m;
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn truncate(&mut self, len: usize) {
        self.count = len;
    }

    pub fn get(&self, index: usize) -> Move {
        self.list[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Move {
        &mut self.list[index]
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.list.swap(a, b);
    }

    pub fn slice_mut(&mut self) -> &mut [Move] {
        &mut self.list[..self.count]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.list[..self.count].iter()
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::{Pieces, Squares};

    #[test]
    fn move_fields_round_trip() {
        let m = Move::new(Squares::E2, Squares::E4, Pieces::WPAWN, 17);
        assert_eq!(m.from(), Squares::E2);
        assert_eq!(m.to(), Squares::E4);
        assert_eq!(m.flag(), Pieces::WPAWN);
        assert_eq!(m.order(), 17);
        assert_eq!(m.as_string(), "e2e4");
    }

    #[test]
    fn sort_byte_does_not_change_identity() {
        let mut a = Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 0);
        let b = Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 200);
        assert!(a.same_move(b));
        a.set_order(99);
        assert_eq!(a.order(), 99);
        assert!(a.same_move(b));
    }

    #[test]
    fn compress_round_trip_on_all_flags() {
        let flags = [
            MoveFlags::NORMAL,
            Pieces::WPAWN,
            Pieces::WKNIGHT,
            Pieces::WBISHOP,
            Pieces::WROOK,
            Pieces::WQUEEN,
            Pieces::BPAWN,
            Pieces::BKNIGHT,
            Pieces::BBISHOP,
            Pieces::BROOK,
            Pieces::BQUEEN,
        ];
        for &flag in flags.iter() {
            let m = Move::new(Squares::B7, Squares::A8, flag, 42);
            let r = m.compress().decompress();
            assert_eq!(r.from(), m.from());
            assert_eq!(r.to(), m.to());
            assert_eq!(r.flag(), m.flag());
            // The sort byte is not preserved, by contract.
            assert_eq!(r.order(), 0);
        }
    }

    #[test]
    fn none_move_compresses_to_none() {
        assert!(Move::NONE.compress().is_none());
        assert!(CMove::NONE.decompress().is_none());
    }

    #[test]
    fn promotion_prints_suffix() {
        let m = Move::new(Squares::B7, Squares::B8, Pieces::WQUEEN, 0);
        assert_eq!(m.as_string(), "b7b8q");
        let p = Move::new(Squares::E7, Squares::E5, Pieces::BPAWN, 0);
        assert_eq!(p.as_string(), "e7e5");
    }

    #[test]
    fn mvv_lva_prefers_valuable_victims_and_cheap_attackers() {
        use crate::board::defs::Kinds;
        let pxq = mvv_lva(Kinds::QUEEN, Kinds::PAWN);
        let qxq = mvv_lva(Kinds::QUEEN, Kinds::QUEEN);
        let pxp = mvv_lva(Kinds::PAWN, Kinds::PAWN);
        assert!(pxq > qxq);
        assert!(qxq > pxp);
        assert!(pxp >= OrderVal::TACTICAL);
        assert!(pxq < OrderVal::CHECK);
    }
}
