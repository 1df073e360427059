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

use super::defs::*;
use super::Search;
use crate::board::{Board, Special};
use crate::defs::{Side, Sides, Square, INF, MAX_DEPTH, MAX_QS_DEPTH, PAWN_V, QUEEN_V};
use crate::movegen::defs::MoveList;

impl Search {
    /// Fail-soft-ish capture search with bounded check extensions:
    /// captures and queen promotions, delta pruning, and from the
    /// fifth qs ply on only recaptures on the previous target square.
    /// Underpromotions are not worth the effort here.
    pub fn quiescence(
        refs: &mut SearchRefs,
        mut alpha: i32,
        beta: i32,
        colour: Side,
        do_checks: bool,
        mut qs_depth: i32,
    ) -> i32 {
        refs.info.nodes += 1;

        let result = refs.eval.evaluate(refs.board);
        if result.enough_material == 0 {
            return 0;
        }
        let mut e = if colour == Sides::BLACK {
            -result.score
        } else {
            result.score
        };
        if refs.board.game_state.fifty_moves >= NO_ACTION_PLIES {
            e = Search::flatten_difference(refs, e);
        }

        // Delay bad positions, reach good ones faster, but never flip
        // the sign of the eval.
        let dist = (refs.board.ply_index() - refs.info.root_ply) as i32;
        if e > 0 {
            e -= dist;
            if e <= 0 {
                e = 1;
            }
        } else if e < 0 {
            e += dist;
            if e >= 0 {
                e = -1;
            }
        }

        // Prevent stack overflow.
        if dist >= MAX_DEPTH + MAX_QS_DEPTH - 1 || Search::user_cancelled(refs) {
            return e;
        }

        // In the pre-search, and after enough qs plies, no check
        // extensions. Depth 0 cannot be in check because negascout
        // does not enter quiescence when in check.
        let mut n_checks = 0;
        let mut check_info = crate::movegen::CheckInfo::NONE;
        if qs_depth < QS_CHECK_DEPTH && qs_depth > 0 && do_checks {
            check_info =
                refs.mg
                    .king_in_check_info(refs.board, colour, &mut refs.info.check_buf);
            n_checks = check_info.checkers;
        }

        let mut list = MoveList::new();
        let mut has_move = false;

        if n_checks == 0 {
            if e >= beta {
                return beta;
            }
            let mut margin = QUEEN_V + PAWN_V;
            if refs.board.stack.top().special == Special::Promotion {
                margin += QUEEN_V - PAWN_V;
            }
            if e + margin < alpha {
                return alpha;
            }

            // Stalemate probe against a lone king; needed in endings
            // like 8/8/1b5p/8/6P1/8/5k1K/8 w and 6K1/5P2/8/5q2/2k5/8/8/8 b.
            if refs.board.lone_king(colour) {
                refs.mg.generate_king_moves(refs.board, colour, &mut list);
                let mut any_legal = false;
                for i in 0..list.len() {
                    refs.board.make(list.get(i));
                    if !refs.mg.king_in_check(refs.board, colour) {
                        any_legal = true;
                    }
                    refs.board.unmake();
                    if any_legal {
                        break;
                    }
                }
                if !any_legal {
                    return 0;
                }
            }

            refs.mg
                .generate_captures_and_promotions(refs.board, colour, &mut list, false);
            if list.is_empty() {
                return e;
            }
            if alpha < e {
                alpha = e;
            }
        } else {
            let buf = refs.info.check_buf;
            refs.mg
                .generate_evasions(refs.board, colour, &buf, check_info, &mut list, false);
        }

        Search::swap_best_to_top(list.slice_mut());
        let recapture: Square = if qs_depth < QS_RECAPT_DEPTH {
            0
        } else {
            refs.board.stack.top().mv.to()
        };
        qs_depth += 1;

        // Continue despite a timeout: the pre-search depends on the
        // quiescence for its fail-safe move, and the qs is quick apart
        // from pathological explosion positions. Still poll the clock.
        Search::check_time(refs);

        let mut actual_moves = 0;
        for i in 0..list.len() {
            if i == 1 && list.len() >= 3 {
                // The first move usually cuts; sort the rest on demand.
                let len = list.len();
                Search::do_sort(&mut list.slice_mut()[1..len]);
            }

            let m = list.get(i);
            let target = m.to();
            let victim_value = Board::piece_value(refs.board.piece_at(target));
            if (e + victim_value + DELTA_MARGIN < alpha)
                || (recapture != 0 && recapture != target)
            {
                // In check this pruning cannot hide a mate: being
                // below alpha already covers it.
                has_move = true;
                continue;
            }

            refs.board.make(m);
            if refs.mg.king_in_check(refs.board, colour) {
                refs.board.unmake();
                continue;
            }
            actual_moves += 1;
            let score = -Search::quiescence(refs, -beta, -alpha, colour ^ 1, do_checks, qs_depth);
            refs.board.unmake();

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        // Mate, but only if no possible evasion has been pruned away.
        if actual_moves == 0
            && n_checks != 0
            && !has_move
            && (refs.info.eval_noise <= 0 || Search::mate_noise(refs, dist))
        {
            return -INF + dist;
        }

        alpha
    }
}
