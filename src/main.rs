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

// Host-side driver: set up a position from the command line, run the
// search or the mate solver once, print the result. On the embedded
// target this role is taken by the HMI loop.

use pocketknight::board::Board;
use pocketknight::engine::defs::{SearchVerdict, StdHost, TimeoutCell};
use pocketknight::engine::kpk::KpkTable;
use pocketknight::engine::transposition::TransTables;
use pocketknight::evaluation::Evaluator;
use pocketknight::misc::cmdline::CmdLine;
use pocketknight::movegen::defs::Move;
use pocketknight::movegen::MoveGenerator;
use pocketknight::search::defs::{SearchInfo, SearchParams, SearchRefs};
use pocketknight::search::Search;

fn main() {
    let cmdline = CmdLine::new();

    let mut board = Board::new();
    if let Err(error) = board.fen_read(Some(&cmdline.fen())) {
        eprintln!("{error}");
        std::process::exit(1);
    }

    let mg = MoveGenerator::new();
    if let Err(reason) = board.validate_position(&mg) {
        eprintln!("position rejected: {reason:?}");
        std::process::exit(1);
    }

    let mut tt = TransTables::new(cmdline.hash());
    let mut eval = Evaluator::new();
    eval.noise_percent = (cmdline.noise().min(100) / 10 * 10) as i32;
    eval.set_kpk(KpkTable::generate());
    eval.game_started_from_0 = false;

    let mut info = SearchInfo::new();
    let mut params = SearchParams::new();
    params.depth = cmdline.depth();
    params.move_time_ms = cmdline.time();
    params.is_analysis = cmdline.analysis();
    params.use_book = false;

    let mut host = StdHost::new(params.move_time_ms, 0x6B6E_6967_6874);
    let timeout = TimeoutCell::new();

    print!("{board}");

    if let Some(mate_moves) = cmdline.mate() {
        let plies = (mate_moves.clamp(1, 8) * 2 - 1) as i32;
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
        let solutions = Search::solve_mate_all(&mut refs, plies, 16);
        if solutions.is_empty() {
            println!("no mate in {mate_moves} found");
        } else {
            for solution in solutions {
                println!("mate: {}", solution.as_string());
            }
        }
        return;
    }

    let time = params.move_time_ms;
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
    match Search::best_move(&mut refs, None, Move::NONE, time) {
        SearchVerdict::Move(m) => {
            println!("bestmove {}", m.as_string());
            println!("pv {}", refs.info.global_pv.as_string());
        }
        SearchVerdict::Resign(m) => {
            println!("bestmove {} (resigns)", m.as_string());
        }
        SearchVerdict::Mate => println!("checkmate"),
        SearchVerdict::Stalemate => println!("stalemate"),
        SearchVerdict::MaterialDraw => println!("draw by insufficient material"),
    }
}
