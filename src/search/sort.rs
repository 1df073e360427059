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

use super::Search;
use crate::movegen::defs::{CMove, Move, MoveList};

// Move list ordering helpers. The lists are short, so a gapped
// insertion sort beats anything with more ceremony.

const SORT_GAPS: [usize; 5] = [57, 23, 10, 4, 1];

impl Search {
    /// Sort moves descending by their order byte.
    pub fn do_sort(moves: &mut [Move]) {
        let n = moves.len();
        for &gap in SORT_GAPS.iter() {
            if gap >= n {
                continue;
            }
            for i in gap..n {
                let tmp = moves[i];
                let mut j = i;
                while j >= gap && moves[j - gap].order() < tmp.order() {
                    moves[j] = moves[j - gap];
                    j -= gap;
                }
                moves[j] = tmp;
            }
        }
    }

    /// Sort moves descending by an external value array, keeping the
    /// values aligned; used by the root pre-sort.
    pub fn do_sort_by_values(moves: &mut [Move], values: &mut [i32]) {
        let n = moves.len();
        for &gap in SORT_GAPS.iter() {
            if gap >= n {
                continue;
            }
            for i in gap..n {
                let tmp_m = moves[i];
                let tmp_v = values[i];
                let mut j = i;
                while j >= gap && values[j - gap] < tmp_v {
                    moves[j] = moves[j - gap];
                    values[j] = values[j - gap];
                    j -= gap;
                }
                moves[j] = tmp_m;
                values[j] = tmp_v;
            }
        }
    }

    /// Move the best-scored move to the front, leaving the rest as is.
    /// The first move usually cuts; sorting the remainder can wait.
    pub fn swap_best_to_top(moves: &mut [Move]) {
        if moves.len() < 2 {
            return;
        }
        let mut best = 0;
        for i in 1..moves.len() {
            if moves[i].order() > moves[best].order() {
                best = i;
            }
        }
        moves.swap(0, best);
    }

    /// Shift `key_move` to the top, sliding the moves before it down
    /// one slot; relative order of the others is preserved.
    pub fn find_put_to_top(list: &mut MoveList, key_move: Move) {
        let len = list.len();
        let Some(pos) = (0..len).find(|&i| list.get(i).same_move(key_move)) else {
            return;
        };
        let keyed = list.get(pos);
        for i in (1..=pos).rev() {
            *list.get_mut(i) = list.get(i - 1);
        }
        *list.get_mut(0) = keyed;
    }

    /// Root variant that drags the per-move opponent-reply cache along
    /// with the moves.
    pub fn find_put_to_top_root(
        list: &mut MoveList,
        replies: &mut [CMove],
        key_move: Move,
    ) {
        let len = list.len();
        let Some(pos) = (0..len).find(|&i| list.get(i).same_move(key_move)) else {
            return;
        };
        let keyed = list.get(pos);
        let keyed_reply = replies[pos];
        for i in (1..=pos).rev() {
            *list.get_mut(i) = list.get(i - 1);
            replies[i] = replies[i - 1];
        }
        *list.get_mut(0) = keyed;
        replies[0] = keyed_reply;
    }
}
