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
use crate::board::defs::{kind_of, Kinds, Pieces, BOARD_FILE_MASK};
use crate::board::Board;
use crate::defs::{Side, Sides, INF, MAX_DEPTH, PAWN_V};
use crate::engine::transposition::Bound;
use crate::movegen::defs::{CMove, Move, MoveList, OrderVal};
use crate::movegen::OrderHints;

/* -------------------------------- NEGA SCOUT ALGORITHM -------------------------------- */

impl Search {
    /// Principal-variation search with null move, futility, LMR, IID,
    /// killers and history. `mlst`/`n_in` may carry a move list the
    /// parent already generated (check evasions, or the root list);
    /// `n_in == 0` requests late generation inside this node.
    /// `best_move_index` reports the index of the best move in `mlst`,
    /// TERMINAL_NODE when the node had no searchable move.
    #[allow(clippy::too_many_arguments)]
    pub fn negascout(
        refs: &mut SearchRefs,
        can_null: bool,
        level: i32,
        pline: &mut PvLine,
        mlst: &mut MoveList,
        n_in: usize,
        depth: i32,
        alpha: i32,
        beta: i32,
        colour: Side,
        best_move_index: &mut isize,
        is_pv_node: bool,
        being_in_check: bool,
        threat_move: Move,
        following_pv: bool,
    ) -> i32 {
        let dist = (refs.board.ply_index() - refs.info.root_ply) as i32;
        let mate_score = INF - dist;

        pline.clear();
        *best_move_index = TERMINAL_NODE;

        // Mate distance pruning.
        if alpha >= mate_score {
            return alpha;
        }
        if beta <= -mate_score {
            return beta;
        }

        if depth <= 0 {
            // Terminal node. High noise settings drop the check
            // extensions, the play is erratic anyway.
            let do_checks = refs.info.eval_noise < HIGH_EVAL_NOISE;
            return Search::quiescence(refs, alpha, beta, colour, do_checks, 0);
        }

        refs.info.nodes += 1;
        let level_gt_1 = level > 1;

        // Prevent stack overflow.
        if dist >= MAX_DEPTH - 1 {
            return Search::quiescence(refs, alpha, beta, colour, true, 0);
        }

        // Check the transposition table for a match. PV nodes must not
        // return from it (that would truncate the PV); they only take
        // the stored move for ordering.
        let hash = refs.board.game_state.position_hash;
        let parity = (level & 1) as usize;
        let mut hash_best = Move::NONE;
        if !is_pv_node {
            let probe = refs.tt.table(parity).probe(hash, depth, alpha, beta, dist);
            if let Some(value) = probe.value {
                if !probe.best.is_none() {
                    pline.load(probe.best, &PvLine::new());
                }
                return value;
            }
            hash_best = probe.best.decompress();
        } else if level_gt_1 {
            hash_best = refs.tt.table(parity).probe_move(hash).decompress();
        }
        if !hash_best.is_none() && !refs.mg.pseudo_legal(refs.board, hash_best, colour) {
            hash_best = Move::NONE;
        }

        // Level 2 has a dedicated move cache from the prior iteration.
        if level == 2 && hash_best.is_none() {
            let cached = refs.info.opp_move_cache[refs.info.root_move_index].decompress();
            if !cached.is_none() && refs.mg.pseudo_legal(refs.board, cached, colour) {
                hash_best = cached;
            }
        }

        // Static eval; the passed-pawn masks are only defined for the
        // endgame.
        let er = refs.eval.evaluate(refs.board);
        let mut e = if colour == Sides::BLACK {
            -er.score
        } else {
            er.score
        };
        let next_colour = colour ^ 1;

        // Insufficient material cannot change toward the leaves.
        if er.enough_material == 0 {
            refs.tt
                .table_mut(parity)
                .store(hash, depth, 0, Bound::Exact, CMove::NONE, dist);
            return 0;
        }
        if refs.board.game_state.fifty_moves >= NO_ACTION_PLIES {
            e = Search::flatten_difference(refs, e);
        }

        let mut null_best = Move::NONE;
        if !is_pv_node && !being_in_check {
            // Reverse futility pruning.
            let last_was_tactical =
                refs.board.stack.top().mv.order() >= OrderVal::TACTICAL;
            if !last_was_tactical
                && depth < RVRS_FUTILITY_DEPTH
                && e - FUTILITY_MARGINS[depth as usize] >= beta
                && (er.enough_material >= EG_PIECES || Search::endgame_reduct(refs))
            {
                return e;
            }
            // Null search. This can fall straight into quiescence,
            // which does no evasions at qs level 0; that is fine
            // because the opponent cannot be in check when it was
            // actually our turn here.
            if can_null && depth >= NULL_START_DEPTH && er.enough_material >= NULL_PIECES {
                let next_depth = depth - (3 + depth / 4) - i32::from(e >= beta + PAWN_V);
                let saved = refs.board.make_null();
                let mut line = PvLine::new();
                let mut x2 = MoveList::new();
                let mut iret = TERMINAL_NODE;
                let t = -Search::negascout(
                    refs,
                    false,
                    level + 1,
                    &mut line,
                    &mut x2,
                    0,
                    next_depth,
                    -beta,
                    -beta + 1,
                    next_colour,
                    &mut iret,
                    is_pv_node,
                    false,
                    Move::NONE,
                    false,
                );
                refs.board.unmake_null(saved);
                if t >= beta {
                    return t;
                }
                // The refutation of doing nothing is a threat; use it
                // for ordering in the sibling subtrees.
                if iret >= 0 {
                    null_best = x2.get(iret as usize);
                }
            }
        }

        // Late move generation: defer while a hash move promises a
        // quick cutoff.
        let mut n = n_in;
        let mut hash_move_mode = false;
        let mut should_iid = true;
        if n == 0 {
            if hash_best.is_none() || following_pv {
                n = Search::generate_with_hints(refs, colour, level, mlst);
                let pv_move = Search::pv_move_at(refs, level, following_pv);
                Search::adjust_priorities(mlst, &mut should_iid, pv_move, hash_best, threat_move);
            } else {
                hash_move_mode = true;
                should_iid = false;
            }
        }

        // Internal iterative deepening; not in the root node, whose
        // pre-sorting has already done the job.
        if should_iid && depth > IID_DEPTH && level_gt_1 {
            let mut line = PvLine::new();
            let mut iret = TERMINAL_NODE;
            Search::negascout(
                refs,
                can_null,
                level,
                &mut line,
                mlst,
                n,
                depth / 3,
                alpha,
                beta,
                colour,
                &mut iret,
                is_pv_node,
                being_in_check,
                threat_move,
                following_pv,
            );
            if iret >= 0 {
                mlst.get_mut(iret as usize).set_order(OrderVal::HASH);
            }
        }

        let mut a = alpha;
        let mut node_moves = 0usize;
        let mut node_pruned_moves = false;

        if level_gt_1 {
            // The root move list is already sorted by the main
            // iterative-deepening loop.
            let end = n.min(mlst.len());
            Search::swap_best_to_top(&mut mlst.slice_mut()[..end]);
        }

        // With a hash move at a non-PV node, try it alone first; it is
        // 90% likely to cut. The move list follows only if it fails.
        if hash_move_mode {
            mlst.truncate(0);
            mlst.push(hash_best);
            n = 2;
        }

        Search::check_time(refs);

        let mut i = 0;
        while i < n {
            if level_gt_1 {
                if i == 1 {
                    if hash_move_mode {
                        // Even later move generation: the hash move
                        // did not cut after all.
                        n = Search::generate_with_hints(refs, colour, level, mlst);
                        // A single pseudo-legal move must have been
                        // the hash move, already tried.
                        if n <= 1 {
                            break;
                        }
                        Search::adjust_priorities(
                            mlst,
                            &mut should_iid,
                            Move::NONE,
                            hash_best,
                            threat_move,
                        );
                        // The hash move sorts to the top and slot 0 is
                        // skipped by starting at 1.
                        Search::do_sort(mlst.slice_mut());
                    } else {
                        let len = mlst.len();
                        Search::do_sort(&mut mlst.slice_mut()[1..len.max(1)]);
                    }
                }
            } else {
                // Level 1 is the root move list.
                refs.info.root_move_index = i;
                refs.info.curr_root_move = mlst.get(i);
            }

            let m = mlst.get(i);
            refs.board.make(m);
            if refs.mg.king_in_check(refs.board, colour) {
                refs.board.unmake();
                i += 1;
                continue;
            }

            let mut threat_best = Move::NONE;
            let mut line = PvLine::new();
            let mut t;

            if refs.board.is_draw_by_repetition_or_fifty() {
                t = Search::path_draw_score(refs, colour);
            } else {
                // If the move just played gives check, generate the
                // evasions here and keep the depth so the line runs
                // deeper; the buffer is the module-wide handshake
                // between check detection and evasion generation.
                let check_info = refs.mg.king_in_check_info(
                    refs.board,
                    next_colour,
                    &mut refs.info.check_buf,
                );
                let n_checks = check_info.checkers;
                let mut x2 = MoveList::new();
                let mut x2len = 0usize;
                let mut can_reduct = false;
                let mut next_depth = depth - 1;

                if n_checks > 0 {
                    if depth <= 4 && refs.info.eval_noise < HIGH_EVAL_NOISE {
                        // Track checks toward the horizon without
                        // replicating whole high-level trees.
                        next_depth = depth;
                    }
                    let buf = refs.info.check_buf;
                    refs.mg.generate_evasions(
                        refs.board,
                        next_colour,
                        &buf,
                        check_info,
                        &mut x2,
                        true,
                    );
                    x2len = x2.len();
                } else {
                    can_reduct = !being_in_check
                        && m.order() < OrderVal::TACTICAL
                        && (er.enough_material >= EG_PIECES || Search::endgame_reduct(refs));

                    // Futility pruning. A pruned legal move still is a
                    // legal move - for the stalemate recognition below.
                    if can_reduct
                        && !is_pv_node
                        && depth < FUTILITY_DEPTH
                        && e + FUTILITY_MARGINS[depth as usize] < a
                    {
                        refs.board.unmake();
                        node_pruned_moves = true;
                        i += 1;
                        continue;
                    }

                    if !Search::timed_out(refs) && refs.info.eval_noise < HIGH_EVAL_NOISE {
                        let pawn_flag = if colour == Sides::WHITE {
                            Pieces::WPAWN
                        } else {
                            Pieces::BPAWN
                        };
                        let passed_mask = if colour == Sides::WHITE {
                            er.w_passed_files
                        } else {
                            er.b_passed_files
                        };
                        if er.is_endgame
                            && depth <= 2
                            && m.flag() == pawn_flag
                            && passed_mask & BOARD_FILE_MASK[m.to()] != 0
                        {
                            // Mutual passed pawn races get special
                            // attention.
                            next_depth = depth;
                        } else if is_pv_node && depth <= PV_ADD_DEPTH {
                            // Equal capture chains must not push
                            // things just over the horizon; unequal
                            // captures resolve in quiescence anyway.
                            let stack_len = refs.board.stack.len();
                            let cap_1 = refs.board.stack.top().captured;
                            if cap_1 != crate::board::defs::Arena::EMPTY {
                                let cap_2 = refs.board.stack.get_ref(stack_len - 2).captured;
                                if cap_2 != crate::board::defs::Arena::EMPTY {
                                    let v1 = Board::piece_value(refs.board.rec(cap_1).piece);
                                    let v2 = Board::piece_value(refs.board.rec(cap_2).piece);
                                    if v1 == v2 {
                                        next_depth = depth;
                                    }
                                }
                            }
                        }
                    }
                }

                let curr_move_follows_pv = following_pv
                    && refs.info.global_pv.len as i32 > level - 1
                    && m.compress() == refs.info.global_pv.cmoves[(level - 1) as usize];

                let mut iret = TERMINAL_NODE;
                if node_moves == 0 {
                    // First move: full window.
                    let child_pv = beta > a + 1;
                    t = -Search::negascout(
                        refs,
                        true,
                        level + 1,
                        &mut line,
                        &mut x2,
                        x2len,
                        next_depth,
                        -beta,
                        -a,
                        next_colour,
                        &mut iret,
                        child_pv,
                        n_checks > 0,
                        null_best,
                        curr_move_follows_pv,
                    );
                } else {
                    if can_reduct && node_moves as i32 >= LMR_MOVES && depth >= LMR_DEPTH_LIMIT {
                        // LMR with a scout window. Do not drop straight
                        // into quiescence at depth 3, there is no check
                        // evasion detection at qs level 0.
                        let reduced = if (node_moves as i32) < 2 * LMR_MOVES || depth <= 3 {
                            depth - 2
                        } else {
                            depth - 3
                        };
                        t = -Search::negascout(
                            refs,
                            true,
                            level + 1,
                            &mut line,
                            &mut x2,
                            x2len,
                            reduced,
                            -a - 1,
                            -a,
                            next_colour,
                            &mut iret,
                            false,
                            n_checks > 0,
                            null_best,
                            curr_move_follows_pv,
                        );
                    } else {
                        t = a + 1; // ensure the re-search happens
                    }
                    if t > a {
                        t = -Search::negascout(
                            refs,
                            true,
                            level + 1,
                            &mut line,
                            &mut x2,
                            x2len,
                            next_depth,
                            -a - 1,
                            -a,
                            next_colour,
                            &mut iret,
                            false,
                            n_checks > 0,
                            null_best,
                            curr_move_follows_pv,
                        );
                        if t > a && t < beta {
                            // Re-search with the full window: PV node.
                            t = -Search::negascout(
                                refs,
                                true,
                                level + 1,
                                &mut line,
                                &mut x2,
                                x2len,
                                next_depth,
                                -beta,
                                -a,
                                next_colour,
                                &mut iret,
                                true,
                                n_checks > 0,
                                null_best,
                                curr_move_follows_pv,
                            );
                        }
                    }
                }
                if iret >= 0 {
                    // Best defense, for the PV update below.
                    threat_best = x2.get(iret as usize);
                }
            }

            let to_square = m.to();
            let moved_piece = refs.board.piece_at(to_square);
            refs.board.unmake();

            if Search::timed_out(refs) {
                return a;
            }

            // In level 1, keep the best level-2 answer for the next
            // main depth iteration.
            if !level_gt_1 && !threat_best.is_none() {
                refs.info.opp_move_cache[i] = threat_best.compress();
            }

            // Alpha-beta pruning proper.
            if t > a {
                a = t;
                *best_move_index = i as isize;
                if !threat_best.is_none() {
                    pline.load(threat_best.compress(), &line);
                } else {
                    pline.clear();
                }
                if a >= beta {
                    // Depth killers for quiet moves; quiet king moves
                    // do not transfer to sibling positions.
                    if refs.board.piece_at(to_square) == Pieces::NONE
                        && kind_of(moved_piece) != Kinds::KING
                    {
                        refs.info.store_killer(colour, level - 1, m.compress());
                    }
                    refs.tt.table_mut(parity).store(
                        hash,
                        depth,
                        a,
                        Bound::Lower,
                        m.compress(),
                        dist,
                    );
                    return a;
                }
                // Quiet move raised alpha: bump the (piece, square)
                // history counter.
                if refs.board.piece_at(to_square) == Pieces::NONE {
                    let entry =
                        &mut refs.info.history[colour][kind_of(moved_piece)][to_square];
                    if *entry == 0 {
                        *entry = -MAX_DEPTH;
                    }
                    *entry += depth;
                    if *entry >= 0 {
                        *entry = -1;
                    }
                }
            }
            node_moves += 1;
            i += 1;
        }

        if node_moves == 0 {
            // No useful and legal moves.
            if !node_pruned_moves {
                if being_in_check {
                    if refs.info.eval_noise <= 0 || Search::mate_noise(refs, dist) {
                        a = -mate_score;
                    } else {
                        a = e; // mate overlooked
                    }
                } else {
                    a = 0; // stalemate
                }
            }
            // Otherwise legal moves existed but fell to the futility
            // pruning; 'a' just stays alpha.
            *best_move_index = TERMINAL_NODE;
        }

        let (bound, best) = if a > alpha {
            let best = if *best_move_index >= 0 {
                mlst.get(*best_move_index as usize).compress()
            } else {
                CMove::NONE
            };
            (Bound::Exact, best)
        } else {
            (Bound::Upper, CMove::NONE)
        };
        refs.tt
            .table_mut(parity)
            .store(hash, depth, a, bound, best, dist);
        a
    }

    // ===================================================================
    // Helpers
    // ===================================================================

    /// Generate all moves with killer/history hints for this level.
    pub(crate) fn generate_with_hints(
        refs: &mut SearchRefs,
        colour: Side,
        level: i32,
        mlst: &mut MoveList,
    ) -> usize {
        let (killer0, killer1) = refs.info.killer_pair(colour, level - 1);
        let hints = OrderHints {
            killer0,
            killer1,
            history: &refs.info.history[colour],
        };
        refs.mg
            .generate_all(refs.board, colour, mlst, true, Some(&hints));
        mlst.len()
    }

    fn pv_move_at(refs: &SearchRefs, level: i32, following_pv: bool) -> Move {
        if following_pv && refs.info.global_pv.len as i32 > level - 1 {
            refs.info.global_pv.cmoves[(level - 1) as usize].decompress()
        } else {
            Move::NONE
        }
    }

    /// Boost the PV, hash, and null-threat moves in the list. Finding
    /// a PV or hash move makes internal iterative deepening pointless.
    pub(crate) fn adjust_priorities(
        mlst: &mut MoveList,
        should_iid: &mut bool,
        pv_move: Move,
        hash_move: Move,
        threat_move: Move,
    ) {
        let want_pv = !pv_move.is_none();
        let want_hash = !hash_move.is_none() && !hash_move.same_move(pv_move);
        let want_threat = !threat_move.is_none()
            && !threat_move.same_move(pv_move)
            && !threat_move.same_move(hash_move);
        if !want_pv && !want_hash && !want_threat {
            return;
        }
        for m in mlst.slice_mut().iter_mut() {
            if want_pv && m.same_move(pv_move) {
                m.set_order(OrderVal::PV);
                *should_iid = false;
            } else if want_hash && m.same_move(hash_move) {
                m.set_order(OrderVal::HASH);
                *should_iid = false;
            } else if want_threat && m.same_move(threat_move) {
                m.set_order(OrderVal::THREAT);
            }
        }
    }

    /// Draw score on the search path: a small contempt keeps the
    /// machine from steering into early repetitions in games from the
    /// initial position.
    pub(crate) fn path_draw_score(refs: &SearchRefs, mover: Side) -> i32 {
        if refs.board.ply_index() < CONTEMPT_END && refs.eval.game_started_from_0 {
            match refs.eval.computer_side {
                Some(side) if side == mover => CONTEMPT_VAL,
                Some(_) => -CONTEMPT_VAL,
                None => 0,
            }
        } else {
            0
        }
    }

    /// In sparse endgames the pruning features stay off near promotion
    /// threats and in the basic endings.
    pub(crate) fn endgame_reduct(refs: &SearchRefs) -> bool {
        let board = &refs.board;
        if board.lone_king(Sides::WHITE)
            || board.lone_king(Sides::BLACK)
            || board.side_pieces(Sides::WHITE).count() <= 1
            || board.side_pieces(Sides::BLACK).count() <= 1
        {
            return false;
        }
        for file in 1..=8usize {
            if board.piece_at(30 + file) == Pieces::BPAWN
                || board.piece_at(80 + file) == Pieces::WPAWN
            {
                return false;
            }
        }
        true
    }
}
