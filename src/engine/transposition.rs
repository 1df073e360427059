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

use crate::board::defs::Hash;
use crate::defs::MATE_CUTOFF;
use crate::movegen::defs::CMove;

// Transposition table: fixed size, keyed by the upper hash bits for
// verification, with small clusters for shallow collision handling.
// Mate scores are stored normalized to the distance from the storing
// node and re-adjusted on probe; without this, transposed mate lines
// would report wrong distances.

const CLUSTER_SIZE: usize = 4;
const DEFAULT_ENTRIES: usize = 4096;
pub const MAX_AGE: u8 = 8;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Bound {
    Exact,
    /// Value is a lower bound (stored on a beta cutoff).
    Lower,
    /// Value is an upper bound (no move raised alpha).
    Upper,
}

#[derive(Clone, Copy)]
struct Entry {
    key_hi: u32,
    value: i16,
    cmove: CMove,
    depth: i8,
    bound: Bound,
    age: u8,
    used: bool,
}

impl Entry {
    const EMPTY: Entry = Entry {
        key_hi: 0,
        value: 0,
        cmove: CMove::NONE,
        depth: 0,
        bound: Bound::Exact,
        age: 0,
        used: false,
    };
}

/// A usable probe result: either a returnable value, or at least the
/// stored best move to guide ordering.
pub struct Probe {
    pub value: Option<i32>,
    pub best: CMove,
}

pub struct TransTable {
    clusters: Box<[[Entry; CLUSTER_SIZE]]>,
    mask: usize,
    age: u8,
}

impl TransTable {
    pub fn new(entries: usize) -> Self {
        let clusters = (entries / CLUSTER_SIZE).next_power_of_two().max(1);
        Self {
            clusters: vec![[Entry::EMPTY; CLUSTER_SIZE]; clusters].into_boxed_slice(),
            mask: clusters - 1,
            age: 0,
        }
    }

    pub fn clear(&mut self) {
        for cluster in self.clusters.iter_mut() {
            *cluster = [Entry::EMPTY; CLUSTER_SIZE];
        }
    }

    /// Advance the generation counter at the start of a new search.
    pub fn age_tick(&mut self) {
        self.age = (self.age + 1) % MAX_AGE;
    }

    /// Look the position up. `depth` is the remaining depth at the
    /// probing node, `dist` its distance from the search root.
    pub fn probe(&self, hash: Hash, depth: i32, alpha: i32, beta: i32, dist: i32) -> Probe {
        let cluster = &self.clusters[(hash as usize) & self.mask];
        let key_hi = (hash >> 32) as u32;

        for entry in cluster.iter() {
            if !entry.used || entry.key_hi != key_hi {
                continue;
            }
            let best = entry.cmove;
            if (entry.depth as i32) < depth {
                return Probe { value: None, best };
            }
            let value = unnormalize(entry.value as i32, dist);
            let usable = match entry.bound {
                Bound::Exact => true,
                Bound::Lower => value >= beta,
                Bound::Upper => value <= alpha,
            };
            return Probe {
                value: if usable { Some(value) } else { None },
                best,
            };
        }
        Probe {
            value: None,
            best: CMove::NONE,
        }
    }

    /// Best-move-only lookup for PV nodes, where returning a value
    /// would truncate the line.
    pub fn probe_move(&self, hash: Hash) -> CMove {
        let cluster = &self.clusters[(hash as usize) & self.mask];
        let key_hi = (hash >> 32) as u32;
        for entry in cluster.iter() {
            if entry.used && entry.key_hi == key_hi {
                return entry.cmove;
            }
        }
        CMove::NONE
    }

    pub fn store(
        &mut self,
        hash: Hash,
        depth: i32,
        value: i32,
        bound: Bound,
        cmove: CMove,
        dist: i32,
    ) {
        let key_hi = (hash >> 32) as u32;
        let age = self.age;
        let cluster = &mut self.clusters[(hash as usize) & self.mask];

        // Pick the slot: same position, else stalest, else shallowest.
        let mut slot = 0;
        let mut best_score = i32::MIN;
        for (i, entry) in cluster.iter().enumerate() {
            if entry.used && entry.key_hi == key_hi {
                slot = i;
                break;
            }
            let staleness = if entry.used {
                age_distance(age, entry.age) as i32 * 64 - entry.depth as i32
            } else {
                i32::MAX - 1
            };
            if staleness > best_score {
                best_score = staleness;
                slot = i;
            }
        }

        let entry = &mut cluster[slot];
        // Keep a deeper result for the same position unless it aged out.
        if entry.used
            && entry.key_hi == key_hi
            && entry.age == age
            && entry.depth as i32 > depth
        {
            return;
        }
        *entry = Entry {
            key_hi,
            value: normalize(value, dist) as i16,
            cmove,
            depth: depth.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            bound,
            age,
            used: true,
        };
    }

    /// Drop entries that have not been refreshed for several searches.
    pub fn cut_old(&mut self, max_age_distance: u8) {
        for cluster in self.clusters.iter_mut() {
            for entry in cluster.iter_mut() {
                if entry.used && age_distance(self.age, entry.age) >= max_age_distance {
                    *entry = Entry::EMPTY;
                }
            }
        }
    }
}

// Two parallel tables, one per side-to-move parity, matching the
// odd/even search levels.
pub struct TransTables {
    tables: [TransTable; 2],
}

impl TransTables {
    pub fn new(entries_per_table: usize) -> Self {
        Self {
            tables: [
                TransTable::new(entries_per_table),
                TransTable::new(entries_per_table),
            ],
        }
    }

    pub fn table(&self, parity: usize) -> &TransTable {
        &self.tables[parity & 1]
    }

    pub fn table_mut(&mut self, parity: usize) -> &mut TransTable {
        &mut self.tables[parity & 1]
    }

    pub fn clear(&mut self) {
        self.tables.iter_mut().for_each(TransTable::clear);
    }

    pub fn age_tick(&mut self) {
        self.tables.iter_mut().for_each(TransTable::age_tick);
    }

    pub fn cut_old(&mut self, max_age_distance: u8) {
        self.tables
            .iter_mut()
            .for_each(|t| t.cut_old(max_age_distance));
    }
}

fn age_distance(current: u8, stored: u8) -> u8 {
    (current + MAX_AGE - stored) % MAX_AGE
}

// Mate scores become distance-from-node on store and distance-from-root
// again on probe.
fn normalize(value: i32, dist: i32) -> i32 {
    if value > MATE_CUTOFF {
        value + dist
    } else if value < -MATE_CUTOFF {
        value - dist
    } else {
        value
    }
}

fn unnormalize(value: i32, dist: i32) -> i32 {
    if value > MATE_CUTOFF {
        value - dist
    } else if value < -MATE_CUTOFF {
        value + dist
    } else {
        value
    }
}

// ======================================================================
// Pawn hash table
// ======================================================================

// Cached pawn-structure evaluation plus the derived file masks that
// feed the rook evaluation. Keyed by the pawn-only hash with a bit for
// middle-game versus endgame weighting.

const PAWN_ENTRIES: usize = 512;

/// Key modifier distinguishing the endgame weighting of a structure.
pub const PAWN_KEY_ENDGAME: Hash = 0x9E37_79B9_7F4A_7C15;

#[derive(Clone, Copy, Default)]
pub struct PawnEntry {
    pub(crate) key_hi: u32,
    pub(crate) used: bool,
    /// Signed extra pawn-structure evaluation, white positive.
    pub eval: i16,
    /// Per-side pawn file occupancy, bit 0 = A file.
    pub w_files: u8,
    pub b_files: u8,
    /// "Good rook file" masks: backward-pawn targets and own passers.
    pub w_rook_files: u8,
    pub b_rook_files: u8,
    /// Passed pawn file masks, needed beyond the rook evaluation.
    pub w_passed_files: u8,
    pub b_passed_files: u8,
}

impl PawnEntry {
    const EMPTY: PawnEntry = PawnEntry {
        key_hi: 0,
        used: false,
        eval: 0,
        w_files: 0,
        b_files: 0,
        w_rook_files: 0,
        b_rook_files: 0,
        w_passed_files: 0,
        b_passed_files: 0,
    };
}

pub struct PawnTable {
    entries: Box<[PawnEntry]>,
    mask: usize,
}

impl PawnTable {
    pub fn new() -> Self {
        Self {
            entries: vec![PawnEntry::EMPTY; PAWN_ENTRIES].into_boxed_slice(),
            mask: PAWN_ENTRIES - 1,
        }
    }

    pub fn probe(&self, key: Hash) -> Option<PawnEntry> {
        let entry = self.entries[(key as usize) & self.mask];
        if entry.used && entry.key_hi == (key >> 32) as u32 {
            Some(entry)
        } else {
            None
        }
    }

    pub fn store(&mut self, key: Hash, mut entry: PawnEntry) {
        entry.key_hi = (key >> 32) as u32;
        entry.used = true;
        self.entries[(key as usize) & self.mask] = entry;
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = PawnEntry::EMPTY);
    }
}

impl Default for PawnTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::defs::Squares;
    use crate::movegen::defs::{Move, MoveFlags};

    fn cmove(from: usize, to: usize) -> CMove {
        Move::new(from, to, MoveFlags::NORMAL, 0).compress()
    }

    #[test]
    fn store_and_probe_round_trip() {
        let mut tt = TransTable::new(1024);
        let hash = 0xDEAD_BEEF_1234_5678u64;
        let mv = cmove(Squares::E2, Squares::E4);
        tt.store(hash, 5, 42, Bound::Exact, mv, 3);

        let probe = tt.probe(hash, 5, -100, 100, 3);
        assert_eq!(probe.value, Some(42));
        assert_eq!(probe.best, mv);

        // Deeper request: value unusable, move still there.
        let probe = tt.probe(hash, 6, -100, 100, 3);
        assert_eq!(probe.value, None);
        assert_eq!(probe.best, mv);
    }

    #[test]
    fn bounds_respect_the_window() {
        let mut tt = TransTable::new(1024);
        let hash = 0x1111_2222_3333_4444u64;
        tt.store(hash, 4, 80, Bound::Lower, CMove::NONE, 0);

        // Lower bound of 80 only cuts when beta <= 80.
        assert_eq!(tt.probe(hash, 4, 0, 50, 0).value, Some(80));
        assert_eq!(tt.probe(hash, 4, 90, 120, 0).value, None);

        tt.store(hash, 4, -60, Bound::Upper, CMove::NONE, 0);
        assert_eq!(tt.probe(hash, 4, -50, 50, 0).value, Some(-60));
        assert_eq!(tt.probe(hash, 4, -80, -70, 0).value, None);
    }

    #[test]
    fn mate_scores_keep_their_distance_across_nodes() {
        use crate::defs::INF;
        let mut tt = TransTable::new(1024);
        let hash = 0xAAAA_BBBB_CCCC_DDDDu64;
        // Mate in 3 plies seen at distance 4 from the root.
        let mate = INF - 7;
        tt.store(hash, 6, mate, Bound::Exact, CMove::NONE, 4);

        // Probing the transposed position at distance 2 must report the
        // mate as seen from there.
        let probe = tt.probe(hash, 6, -INF, INF, 2);
        assert_eq!(probe.value, Some(INF - 5));
    }

    #[test]
    fn aging_prefers_to_evict_stale_entries() {
        let mut tt = TransTable::new(64);
        let hash = 0x0F0F_0F0F_0F0F_0F0Fu64;
        tt.store(hash, 9, 10, Bound::Exact, CMove::NONE, 0);
        for _ in 0..3 {
            tt.age_tick();
        }
        tt.cut_old(2);
        assert_eq!(tt.probe(hash, 1, -100, 100, 0).value, None);
        assert!(tt.probe_move(hash).is_none());
    }

    #[test]
    fn same_age_deeper_entry_is_kept() {
        let mut tt = TransTable::new(64);
        let hash = 0x1234_0000_5678_0000u64;
        let deep_move = cmove(Squares::D2, Squares::D4);
        tt.store(hash, 8, 33, Bound::Exact, deep_move, 0);
        tt.store(hash, 2, -5, Bound::Upper, cmove(Squares::A2, Squares::A3), 0);
        let probe = tt.probe(hash, 3, -100, 100, 0);
        assert_eq!(probe.value, Some(33));
        assert_eq!(probe.best, deep_move);
    }

    #[test]
    fn pawn_table_round_trip() {
        let mut pt = PawnTable::new();
        let key = 0x5555_6666_7777_8888u64;
        assert!(pt.probe(key).is_none());
        let entry = PawnEntry {
            eval: -35,
            w_files: 0b1110_0111,
            b_files: 0b1111_0111,
            w_rook_files: 0b0001_0000,
            b_rook_files: 0,
            w_passed_files: 0b0000_1000,
            b_passed_files: 0,
            ..PawnEntry::EMPTY
        };
        pt.store(key, entry);
        let hit = pt.probe(key).expect("entry stored");
        assert_eq!(hit.eval, -35);
        assert_eq!(hit.w_rook_files, 0b0001_0000);
        // The endgame weighting uses a different key.
        assert!(pt.probe(key ^ PAWN_KEY_ENDGAME).is_none());
    }
}
