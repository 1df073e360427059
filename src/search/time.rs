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

use super::defs::{SearchRefs, NO_ACTION_PLIES};
use super::Search;
use crate::engine::defs::Timeout;

impl Search {
    /// Cooperative time poll: ask the host for the hard deadline and
    /// raise the sticky timeout flag. The flag may also appear
    /// asynchronously from the timer interrupt (user cancel); both are
    /// only ever cleared by the root.
    pub fn check_time(refs: &mut SearchRefs) {
        if refs.host.time_exhausted() && refs.timeout.get() == Timeout::None {
            refs.timeout.set(Timeout::TimeUp);
        }
    }

    pub fn timed_out(refs: &SearchRefs) -> bool {
        refs.timeout.is_set()
    }

    pub fn user_cancelled(refs: &SearchRefs) -> bool {
        refs.timeout.get() == Timeout::UserCancel
    }

    /// Fifty-move flattening: from 40 action-less plies on, scale the
    /// eval down linearly so the looming draw does not arrive as a
    /// surprise; at 100 plies the position is simply a draw. Basic
    /// endgames are exempt, their mates need the full gradient.
    /// Callers only invoke this when the counter is already at or
    /// beyond NO_ACTION_PLIES.
    pub fn flatten_difference(refs: &SearchRefs, eval: i32) -> i32 {
        let board = &refs.board;
        if board.lone_king(crate::defs::Sides::WHITE)
            || board.lone_king(crate::defs::Sides::BLACK)
            || board.side_pieces(crate::defs::Sides::WHITE).count() <= 1
            || board.side_pieces(crate::defs::Sides::BLACK).count() <= 1
        {
            return eval;
        }
        let fifty = board.game_state.fifty_moves;
        if fifty >= 100 {
            return 0;
        }
        // 90% discount spread over the 60 plies up to the draw.
        eval * (107 - fifty as i32) / (107 - NO_ACTION_PLIES as i32)
    }

    /// Mate detection under eval noise: each additional move of mate
    /// distance multiplies the detection probability by the non-noise
    /// part, so long mates get overlooked more often.
    pub fn mate_noise(refs: &mut SearchRefs, dist_plies: i32) -> bool {
        let noise = refs.info.eval_noise;
        if noise <= 0 {
            return true;
        }
        let keep = (100 - noise.clamp(0, 100)) as u64;
        let mut prob: u64 = 100;
        for _ in 0..(dist_plies / 2) {
            prob = (prob * keep + 50) / 100;
        }
        (refs.host.random() % 101) as u64 <= prob
    }
}

#[cfg(test)]
mod tests {
    use super::super::defs::{SearchInfo, SearchParams};
    use super::*;
    use crate::board::Board;
    use crate::engine::defs::{StdHost, TimeoutCell};
    use crate::engine::transposition::TransTables;
    use crate::evaluation::Evaluator;
    use crate::movegen::MoveGenerator;

    fn with_refs<R>(fen: &str, fifty: u16, f: impl FnOnce(&mut SearchRefs) -> R) -> R {
        with_refs_budget(fen, fifty, 60_000, f)
    }

    fn with_refs_budget<R>(
        fen: &str,
        fifty: u16,
        budget_ms: i64,
        f: impl FnOnce(&mut SearchRefs) -> R,
    ) -> R {
        let mut board = Board::new();
        board.fen_read(Some(fen)).unwrap();
        board.game_state.fifty_moves = fifty;
        let mg = MoveGenerator::new();
        let mut tt = TransTables::new(256);
        let mut eval = Evaluator::new();
        let mut info = SearchInfo::new();
        let params = SearchParams::new();
        let mut host = StdHost::new(budget_ms, 7);
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
        f(&mut refs)
    }

    #[test]
    fn flattening_scales_and_zeroes() {
        let fen = "r3k3/pppppppp/8/8/8/8/PPPPPPPP/R3K3 w - - 0 1";
        let at_40 = with_refs(fen, 40, |refs| Search::flatten_difference(refs, 200));
        let at_70 = with_refs(fen, 70, |refs| Search::flatten_difference(refs, 200));
        let at_100 = with_refs(fen, 100, |refs| Search::flatten_difference(refs, 200));
        assert!(at_40 <= 200 && at_40 >= 180);
        assert!(at_70 < at_40);
        assert_eq!(at_100, 0);
    }

    #[test]
    fn basic_endgames_are_not_flattened() {
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        let eval = with_refs(fen, 80, |refs| Search::flatten_difference(refs, 300));
        assert_eq!(eval, 300);
    }

    #[test]
    fn timeout_flag_is_raised_once_budget_is_gone() {
        // Zero budget: the first poll must raise the flag.
        with_refs_budget("4k3/8/8/8/8/8/8/4K3 w - - 0 1", 0, 0, |refs| {
            assert!(!Search::timed_out(refs));
            Search::check_time(refs);
            assert!(Search::timed_out(refs));
        });
    }

    #[test]
    fn mate_noise_is_certain_without_noise() {
        with_refs("4k3/8/8/8/8/8/8/4K3 w - - 0 1", 0, |refs| {
            for dist in [1, 5, 9] {
                assert!(Search::mate_noise(refs, dist));
            }
        });
    }
}
