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

// King-and-pawn versus king bitbase. The table is 24 KiB: two sides to
// move, pawn on files A-D ranks 2-7 (files E-H are mirrored at the
// call site), 64 white king squares, one bit per black king square.
// The evaluation treats a probe result of 1 as "decisive" (the pawn
// promotes), 0 as a draw. On the embedded target the table lives in
// ROM; on a hosted build it is generated once at startup by the same
// retrograde fixed-point the table file was produced with.

use crate::defs::{Side, Sides};

const PAWN_SLOTS: usize = 24 * 64;
pub const KPK_TABLE_BYTES: usize = 2 * PAWN_SLOTS * 8;

const FILE_A: u64 = 0x0101_0101_0101_0101;
const FILE_H: u64 = 0x8080_8080_8080_8080;

pub struct KpkTable {
    bits: Box<[u8]>,
}

impl KpkTable {
    /// Wrap a pre-generated 24 KiB table (e.g. from ROM).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KPK_TABLE_BYTES {
            return None;
        }
        Some(Self {
            bits: bytes.to_vec().into_boxed_slice(),
        })
    }

    /// Probe with 8x8 squares (A1 = 0). Returns true when the position
    /// is decisive, i.e. the pawn side wins with correct play; false
    /// for a draw. `side` is the side to move. The position must be
    /// legal for a meaningful result.
    pub fn probe(&self, side: Side, mut wk: usize, mut wp: usize, mut bk: usize) -> bool {
        // Mirror pawn files E-H onto A-D.
        if wp & 7 >= 4 {
            wk ^= 7;
            wp ^= 7;
            bk ^= 7;
        }
        let rank = wp >> 3;
        let file = wp & 7;
        debug_assert!((1..=6).contains(&rank));
        // Rank 1 pawns are not in the table; the lowest 4*64 slots of
        // the full pawn index space are cut away.
        let pawn_ix = (rank * 4 + file) - 4;
        let slot = (side * PAWN_SLOTS + pawn_ix * 64 + wk) * 8 + (bk >> 3);
        (self.bits[slot] >> (bk & 7)) & 1 != 0
    }

    /// Probe for a black pawn by flipping colours and the board.
    pub fn probe_reverse(&self, side: Side, wk: usize, bp: usize, bk: usize) -> bool {
        self.probe(side ^ 1, bk ^ 56, bp ^ 56, wk ^ 56)
    }

    /// Retrograde generation of the full table.
    pub fn generate() -> Self {
        const SLOTS: usize = 32 * 64;
        let mut tab = vec![[0u64; 2]; SLOTS];
        let mut valid = vec![0u64; SLOTS];

        for ix in 0..SLOTS {
            let wk = ix & 63;
            let p_ix = ix >> 6;
            let (pf, pr) = (p_ix & 3, p_ix >> 2);
            let wp = pr * 8 + pf;

            // Positions after a winning promotion; stalemate can be
            // ignored at this point.
            if pr == 7 && wk != wp {
                let mut lost = !king_zone(bit(wk)) & !bit(wk) & !bit(wp);
                if dist(wk, wp) > 1 {
                    // An unprotected fresh queen could be taken.
                    lost &= !king_zone(bit(wp));
                }
                tab[ix][Sides::BLACK] = lost;
            }

            // Squares the black king may legally occupy after his move;
            // capturing the pawn is allowed, its attack squares are not.
            valid[ix] = !king_zone(bit(wk));
            if pr != 7 && pf != 0 {
                valid[ix] &= !bit(wp + 7);
            }
            if pr != 7 && pf != 7 {
                valid[ix] &= !bit(wp + 9);
            }
        }

        loop {
            for ix in 0..SLOTS {
                let wk = ix & 63;
                let p_ix = ix >> 6;
                let (pf, pr) = (p_ix & 3, p_ix >> 2);
                let wp = pr * 8 + pf;
                if !(1..=6).contains(&pr) {
                    continue;
                }

                // White king moves.
                let mut won = 0u64;
                let mut steps = king_zone(bit(wk));
                while steps != 0 {
                    let to = pop_lsb(&mut steps);
                    if to != wp {
                        won |= tab[(p_ix << 6) | to][Sides::BLACK] & !king_zone(bit(to));
                    }
                }
                // White pawn moves.
                let up = wp + 8;
                if up != wk {
                    won |= tab[((p_ix + 4) << 6) | wk][Sides::BLACK] & !bit(up);
                    if pr == 1 && wp + 16 != wk {
                        won |= tab[((p_ix + 8) << 6) | wk][Sides::BLACK]
                            & !bit(up)
                            & !bit(wp + 16);
                    }
                }
                tab[ix][Sides::WHITE] = won & !bit(wp);
            }

            let mut changed = false;
            for ix in 0..SLOTS {
                let p_ix = ix >> 6;
                if !(1..=6).contains(&(p_ix >> 2)) {
                    continue;
                }
                // Black king moves: lost when every legal destination
                // is a white win.
                let is_bad = tab[ix][Sides::WHITE] | !valid[ix];
                let can_draw = king_zone(!is_bad);
                let has_moves = king_zone(valid[ix]);
                let lost = has_moves & !can_draw;
                changed |= tab[ix][Sides::BLACK] != lost;
                tab[ix][Sides::BLACK] = lost;
            }
            if !changed {
                break;
            }
        }

        // Pack pawn ranks 2-7 into the 24 KiB byte table, little endian.
        let mut bits = vec![0u8; KPK_TABLE_BYTES].into_boxed_slice();
        for side in [Sides::WHITE, Sides::BLACK] {
            for lookup_ix in 0..PAWN_SLOTS {
                let val = tab[lookup_ix + 4 * 64][side];
                let base = (side * PAWN_SLOTS + lookup_ix) * 8;
                bits[base..base + 8].copy_from_slice(&val.to_le_bytes());
            }
        }
        Self { bits }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

fn bit(sq: usize) -> u64 {
    1u64 << sq
}

fn pop_lsb(set: &mut u64) -> usize {
    let sq = set.trailing_zeros() as usize;
    *set &= *set - 1;
    sq
}

fn dist(a: usize, b: usize) -> usize {
    let df = (a as i32 % 8 - b as i32 % 8).unsigned_abs() as usize;
    let dr = (a as i32 / 8 - b as i32 / 8).unsigned_abs() as usize;
    df.max(dr)
}

fn king_zone(set: u64) -> u64 {
    let ew = ((set & !FILE_H) << 1) | ((set & !FILE_A) >> 1);
    let row = set | ew;
    ew | (row << 8) | (row >> 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn table() -> &'static KpkTable {
        static TABLE: OnceLock<KpkTable> = OnceLock::new();
        TABLE.get_or_init(KpkTable::generate)
    }

    fn sq(file: char, rank: usize) -> usize {
        (rank - 1) * 8 + (file as usize - 'a' as usize)
    }

    #[test]
    fn known_wins_and_draws() {
        let t = table();
        // Kd6, Pe5, kd8: classic win with the king in front.
        assert!(t.probe(Sides::WHITE, sq('d', 6), sq('e', 5), sq('d', 8)));
        // Rook pawn with defending king in the corner is a draw.
        assert!(!t.probe(Sides::WHITE, sq('b', 6), sq('a', 5), sq('a', 8)));
        // Ke6, Pe5, ke8 white to move: 1.Kd6/Kf6 wins.
        assert!(t.probe(Sides::WHITE, sq('e', 6), sq('e', 5), sq('e', 8)));
        // Same position black to move: opposition, draw.
        assert!(!t.probe(Sides::BLACK, sq('e', 6), sq('e', 5), sq('e', 8)));
    }

    #[test]
    fn mirrored_files_agree() {
        let t = table();
        for rank in 2..=7usize {
            // The h-file probe must equal the mirrored a-file probe.
            let wp_h = sq('h', rank);
            let wp_a = sq('a', rank);
            let res_h = t.probe(Sides::WHITE, sq('g', 6.min(rank + 1)), wp_h, sq('h', 8));
            let res_a = t.probe(Sides::WHITE, sq('b', 6.min(rank + 1)), wp_a, sq('a', 8));
            assert_eq!(res_h, res_a, "mirror mismatch at rank {rank}");
        }
    }

    #[test]
    fn reverse_probe_flips_colours() {
        let t = table();
        // Black pawn e4, black king e3, white king e1: the flipped
        // image of Ke6/Pe5/ke8. White to move mirrors the black-to-move
        // draw, black to move mirrors the white-to-move win.
        assert!(!t.probe_reverse(Sides::WHITE, sq('e', 1), sq('e', 4), sq('e', 3)));
        assert!(t.probe_reverse(Sides::BLACK, sq('e', 1), sq('e', 4), sq('e', 3)));
    }

    #[test]
    fn byte_round_trip() {
        let t = table();
        let copy = KpkTable::from_bytes(t.as_bytes()).expect("size matches");
        assert_eq!(
            copy.probe(Sides::WHITE, sq('e', 6), sq('e', 5), sq('e', 8)),
            t.probe(Sides::WHITE, sq('e', 6), sq('e', 5), sq('e', 8))
        );
        assert!(KpkTable::from_bytes(&[0u8; 7]).is_none());
    }
}
