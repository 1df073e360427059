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
use crate::board::defs::{kind_of, Kinds, Pieces};
use crate::defs::{Side, INF, MATE_CUTOFF, MAX_DEPTH};
use crate::engine::transposition::Bound;
use crate::movegen::defs::{Move, MoveList, OrderVal};

// The mating solver: a fixed-depth search where, within the check
// horizon, the attacker tries only checking moves. The last few plies
// of a mating combination are almost always a series of checks, so
// the horizon starts at the full depth and widens by two plies per
// failed round. The defender always has every answer available, and
// underpromotions are in - puzzles may require them.

impl Search {
    #[allow(clippy::too_many_arguments)]
    pub fn negamate(
        refs: &mut SearchRefs,
        depth: i32,
        alpha: i32,
        beta: i32,
        colour: Side,
        check_depth: i32,
        pline: &mut PvLine,
        blocked: &[Move],
        root_node: bool,
        in_check: bool,
    ) -> i32 {
        pline.clear();
        let dist = (refs.board.ply_index() - refs.info.root_ply) as i32;

        // Should never hit: the maximum mate depth is far below the
        // stack bound. Just in case something changes.
        if dist >= MAX_DEPTH - 1 {
            return 0;
        }
        if refs.board.is_draw_by_repetition_or_fifty() {
            return 0;
        }

        let hash = refs.board.game_state.position_hash;
        let probe = refs
            .tt
            .table(colour)
            .probe(hash, depth, alpha, beta, dist);
        if let Some(value) = probe.value {
            return value;
        }

        // First phase: get the moves, filter out the illegal ones, and
        // prioritise the check-delivering moves. The history is keyed
        // by the remaining depth here; the solver has no selective
        // deepening, so the depth works as the level.
        let mut movelist = MoveList::new();
        if !in_check {
            Search::generate_with_hints(refs, colour, depth + 1, &mut movelist);
        } else {
            let check_info =
                refs.mg
                    .king_in_check_info(refs.board, colour, &mut refs.info.check_buf);
            let buf = refs.info.check_buf;
            refs.mg
                .generate_evasions(refs.board, colour, &buf, check_info, &mut movelist, true);
        }
        let n = movelist.len();
        let next_colour = colour ^ 1;

        let mut actual_move_cnt = 0;
        let mut checking = 0;
        for i in 0..n {
            // When searching for double solutions, the already found
            // keys are blocked at the root.
            if root_node && blocked.iter().any(|b| b.same_move(movelist.get(i))) {
                movelist.get_mut(i).set_order(OrderVal::ILLEGAL);
                continue;
            }
            let m = movelist.get(i);
            refs.board.make(m);
            if refs.mg.king_in_check(refs.board, colour) {
                movelist.get_mut(i).set_order(OrderVal::ILLEGAL);
            } else {
                // A legal move at depth 0 means it is not checkmate.
                if depth == 0 {
                    refs.board.unmake();
                    return 0;
                }
                actual_move_cnt += 1;
                if refs.mg.king_in_check(refs.board, next_colour) {
                    checking += 1;
                    movelist.get_mut(i).set_order(OrderVal::CHECK);
                }
            }
            refs.board.unmake();
        }

        // At depth 0 the parent played only checking moves, so with no
        // legal move left this is mate, not stalemate.
        if depth == 0 {
            return -INF + dist;
        }
        if actual_move_cnt == 0 {
            return if in_check { -INF + dist } else { 0 };
        }

        // Within the check horizon the attacker (odd remaining depth)
        // keeps only the checking moves; no check, no mate.
        let restrict_to_checks = depth <= check_depth && depth & 1 == 1;
        if restrict_to_checks && checking == 0 {
            return 0;
        }

        Search::swap_best_to_top(movelist.slice_mut());

        Search::check_time(refs);
        if Search::timed_out(refs) {
            return 0;
        }

        let mut a = alpha;
        let mut line = PvLine::new();
        for i in 0..n {
            if i == 1 && n > 2 {
                Search::do_sort(&mut movelist.slice_mut()[1..n]);
            }
            let m = movelist.get(i);
            if m.order() == OrderVal::ILLEGAL {
                continue;
            }
            let giving_check = m.order() == OrderVal::CHECK;
            if restrict_to_checks && !giving_check {
                continue;
            }

            refs.board.make(m);
            // Blocked moves only exist at the root level.
            let score = -Search::negamate(
                refs,
                depth - 1,
                -beta,
                -a,
                next_colour,
                check_depth,
                &mut line,
                &[],
                false,
                giving_check,
            );
            let to_square = m.to();
            let moved_piece = refs.board.piece_at(to_square);
            refs.board.unmake();

            if score > a {
                a = score;
                pline.load(m.compress(), &line);

                if root_node && score > MATE_CUTOFF {
                    // All we are looking for.
                    return score;
                }
                if score >= beta {
                    refs.tt.table_mut(colour).store(
                        hash,
                        depth,
                        score,
                        Bound::Lower,
                        m.compress(),
                        dist,
                    );
                    // Depth killers for quiet moves; quiet king moves
                    // generally do not work in sibling positions.
                    if refs.board.piece_at(to_square) == Pieces::NONE
                        && kind_of(moved_piece) != Kinds::KING
                    {
                        refs.info.store_killer(colour, depth, m.compress());
                    }
                    return score;
                }
            }
        }

        let bound = if a > alpha { Bound::Exact } else { Bound::Upper };
        refs.tt
            .table_mut(colour)
            .store(hash, depth, a, bound, pline.first(), dist);
        a
    }

    /// Look for a forcing mate within `max_plies`, leaving out the
    /// blocked first moves. Starts with the tightest check-only
    /// horizon and widens it by two plies per round; it is amazing how
    /// much time this little scheme saves.
    pub fn solve_mate(
        refs: &mut SearchRefs,
        max_plies: i32,
        blocked: &[Move],
        pline: &mut PvLine,
    ) -> bool {
        pline.clear();
        let colour = refs.board.us();
        refs.info.root_ply = refs.board.ply_index();
        let in_check = refs.mg.king_in_check(refs.board, colour);

        // Any non-blocked legal move at all?
        let mut movelist = MoveList::new();
        if in_check {
            let check_info =
                refs.mg
                    .king_in_check_info(refs.board, colour, &mut refs.info.check_buf);
            let buf = refs.info.check_buf;
            refs.mg
                .generate_evasions(refs.board, colour, &buf, check_info, &mut movelist, true);
        } else {
            refs.mg
                .generate_all(refs.board, colour, &mut movelist, true, None);
        }
        let mut any_legal = false;
        for i in 0..movelist.len() {
            let m = movelist.get(i);
            if blocked.iter().any(|b| b.same_move(m)) {
                continue;
            }
            refs.board.make(m);
            if !refs.mg.king_in_check(refs.board, colour) {
                any_legal = true;
            }
            refs.board.unmake();
            if any_legal {
                break;
            }
        }
        if !any_legal {
            return false;
        }

        let mut result = 0;
        let mut check_depth = max_plies;
        while check_depth > 0 && result <= MATE_CUTOFF && !Search::timed_out(refs) {
            refs.info.reset_history();
            refs.tt.clear();
            result = Search::negamate(
                refs,
                max_plies,
                0,
                INF,
                colour,
                check_depth,
                pline,
                blocked,
                true,
                in_check,
            );
            check_depth -= 2;
        }

        refs.info.reset_history();
        refs.tt.clear();
        result > MATE_CUTOFF
    }

    /// Enumerate distinct key moves: every found solution's first move
    /// is blocked and the search repeats until it comes up dry.
    pub fn solve_mate_all(
        refs: &mut SearchRefs,
        max_plies: i32,
        max_solutions: usize,
    ) -> Vec<PvLine> {
        let mut blocked: Vec<Move> = Vec::new();
        let mut solutions = Vec::new();

        while solutions.len() < max_solutions {
            let mut pline = PvLine::new();
            if !Search::solve_mate(refs, max_plies, &blocked, &mut pline) {
                break;
            }
            blocked.push(pline.first().decompress());
            solutions.push(pline);
        }
        solutions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::engine::defs::{StdHost, TimeoutCell};
    use crate::engine::transposition::TransTables;
    use crate::evaluation::Evaluator;
    use crate::movegen::MoveGenerator;

    fn solve(fen: &str, plies: i32, max_solutions: usize) -> Vec<PvLine> {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        let mg = MoveGenerator::new();
        let mut tt = TransTables::new(2048);
        let mut eval = Evaluator::new();
        let mut info = SearchInfo::new();
        let params = SearchParams::new();
        let mut host = StdHost::new(60_000, 11);
        let timeout = TimeoutCell::new();
        let mut refs = SearchRefs {
            board: &mut board,
            mg: &mg,
            tt: &mut tt,
            eval: &mut eval,
            info: &mut info,
            params: &params,
            host: &mut host,
            timeout: &timeout,
            report_tx: None,
        };
        Search::solve_mate_all(&mut refs, plies, max_solutions)
    }

    #[test]
    fn finds_a_mate_in_one() {
        // Back-rank mate: Ra8#.
        let solutions = solve("4k3/8/4K3/8/8/8/8/R7 w - - 0 1", 1, 1);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].len, 1);
        assert_eq!(solutions[0].as_string(), "a1a8");
    }

    #[test]
    fn reports_all_distinct_keys() {
        // Two rooks, two distinct mates in one (Ra8#, Rb8#... the
        // second rook mates from b1-b8 once a8 is blocked).
        let solutions = solve("4k3/8/4K3/8/8/8/8/R6R w - - 0 1", 1, 8);
        let keys: Vec<String> = solutions.iter().map(|s| s.as_string()).collect();
        assert!(keys.contains(&String::from("a1a8")));
        assert!(keys.contains(&String::from("h1h8")));
        assert_eq!(solutions.len(), 2);
    }

    #[test]
    fn no_mate_means_no_solution() {
        let solutions = solve("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", 1, 1);
        assert!(solutions.is_empty());
    }

    #[test]
    fn mate_in_two_with_quiet_key() {
        // K+Q vs K: 1.Qb6 (quiet) ... 2.Qb8#/Qd8# - a forced mate in
        // three plies that the widening scheme must find even though
        // the key move gives no check.
        let solutions = solve("k7/8/2K5/8/8/8/8/7Q w - - 0 1", 3, 1);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].len, 3);
        // The defender king is already cornered; the found line must
        // end in mate, i.e. the last move is a queen move.
        let last = solutions[0].cmoves[2].decompress();
        assert!(!last.is_none());
    }

    #[test]
    fn composed_puzzle_mate_in_two() {
        let solutions = solve(
            "1QqQqQq1/r6Q/Q6q/q6Q/B2q4/q6Q/k6K/1qQ1QqRb w - - 0 1",
            3,
            1,
        );
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].len, 3, "pv: {}", solutions[0].as_string());
    }
}
