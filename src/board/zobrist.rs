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

use super::defs::{GFlags, Hash};
use crate::defs::{NrOf, Piece, Side, Square};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

const RNG_SEED: u64 = 0x434F_524E_4552_5351;

// Castling state is hashed through the six "has moved" flags of kings
// and rooks, compacted into a 6-bit index.
const CASTLING_STATES: usize = 64;

pub struct ZobristRandoms {
    rnd_pieces: [[Hash; NrOf::CELLS]; NrOf::PIECE_TYPES],
    rnd_castling: [Hash; CASTLING_STATES],
    rnd_sides: [Hash; 2],
    rnd_ep: [Hash; NrOf::CELLS],
}

impl ZobristRandoms {
    pub fn new() -> Self {
        let mut random = ChaCha20Rng::seed_from_u64(RNG_SEED);
        let mut zr = Self {
            rnd_pieces: [[0; NrOf::CELLS]; NrOf::PIECE_TYPES],
            rnd_castling: [0; CASTLING_STATES],
            rnd_sides: [0; 2],
            rnd_ep: [0; NrOf::CELLS],
        };

        zr.rnd_pieces.iter_mut().for_each(|piece| {
            piece
                .iter_mut()
                .for_each(|square| *square = random.next_u64())
        });
        zr.rnd_castling
            .iter_mut()
            .for_each(|state| *state = random.next_u64());
        zr.rnd_sides
            .iter_mut()
            .for_each(|side| *side = random.next_u64());
        zr.rnd_ep
            .iter_mut()
            .for_each(|square| *square = random.next_u64());

        // "No en-passant square" must not shift the key.
        zr.rnd_ep[0] = 0;
        zr
    }

    pub fn piece(&self, piece: Piece, square: Square) -> Hash {
        self.rnd_pieces[piece][square]
    }

    pub fn castling(&self, gflags: u16) -> Hash {
        // Compact the six moved flags; the castled markers and the
        // side-moved bit do not identify the position.
        let w = (gflags & (GFlags::WKMOVED | GFlags::WRA1MOVED | GFlags::WRH1MOVED)) as usize;
        let b = (gflags & (GFlags::BKMOVED | GFlags::BRA8MOVED | GFlags::BRH8MOVED)) as usize;
        self.rnd_castling[w | (b >> 1)]
    }

    pub fn side(&self, side: Side) -> Hash {
        self.rnd_sides[side]
    }

    pub fn en_passant(&self, ep_square: Square) -> Hash {
        self.rnd_ep[ep_square]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Pieces;
    use crate::board::defs::Squares;
    use crate::defs::Sides;

    #[test]
    fn keys_are_reproducible() {
        let a = ZobristRandoms::new();
        let b = ZobristRandoms::new();
        assert_eq!(
            a.piece(Pieces::WROOK, Squares::E4),
            b.piece(Pieces::WROOK, Squares::E4)
        );
        assert_eq!(a.side(Sides::BLACK), b.side(Sides::BLACK));
    }

    #[test]
    fn no_ep_square_is_neutral() {
        let zr = ZobristRandoms::new();
        assert_eq!(zr.en_passant(0), 0);
        assert_ne!(zr.en_passant(Squares::E3), 0);
    }

    #[test]
    fn castling_index_covers_all_flag_mixes() {
        let zr = ZobristRandoms::new();
        let all_w = GFlags::WKMOVED | GFlags::WRA1MOVED | GFlags::WRH1MOVED;
        let all_b = GFlags::BKMOVED | GFlags::BRA8MOVED | GFlags::BRH8MOVED;
        assert_ne!(zr.castling(0), zr.castling(all_w));
        assert_ne!(zr.castling(all_w), zr.castling(all_b));
        assert_ne!(zr.castling(all_b), zr.castling(all_w | all_b));
    }
}
