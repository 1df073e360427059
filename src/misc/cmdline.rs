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

use crate::defs::FEN_START_POSITION;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

// Consts for command line options, flags and arguments

struct CmdLineArgs {}
impl CmdLineArgs {
    // FEN
    const FEN_LONG: &'static str = "fen";
    const FEN_SHORT: char = 'f';
    const FEN_HELP: &'static str = "Set up the given position";

    // Time per move
    const TIME_LONG: &'static str = "time";
    const TIME_SHORT: char = 't';
    const TIME_HELP: &'static str = "Time per move in milliseconds";
    const TIME_DEFAULT: i64 = 10_000;

    // Depth
    const DEPTH_LONG: &'static str = "depth";
    const DEPTH_SHORT: char = 'd';
    const DEPTH_HELP: &'static str = "Maximum search depth in plies";
    const DEPTH_DEFAULT: i32 = crate::defs::MAX_DEPTH;

    // Mate solver
    const MATE_LONG: &'static str = "mate";
    const MATE_SHORT: char = 'm';
    const MATE_HELP: &'static str = "Solve for mate in the given number of moves";

    // Eval noise
    const NOISE_LONG: &'static str = "noise";
    const NOISE_SHORT: char = 'n';
    const NOISE_HELP: &'static str = "Eval noise in percent (0-100, 10% steps)";
    const NOISE_DEFAULT: u32 = 0;

    // Analysis mode
    const ANALYSIS_LONG: &'static str = "analysis";
    const ANALYSIS_SHORT: char = 'a';
    const ANALYSIS_HELP: &'static str = "Analysis mode: search until stopped";

    // Hash
    const HASH_LONG: &'static str = "hash";
    const HASH_HELP: &'static str = "Transposition table entries per side table";
    const HASH_DEFAULT: usize = 4096;
}

pub struct CmdLine {
    arguments: ArgMatches,
}

impl CmdLine {
    pub fn new() -> Self {
        Self {
            arguments: Self::get(),
        }
    }

    pub fn fen(&self) -> String {
        self.arguments
            .get_one::<String>(CmdLineArgs::FEN_LONG)
            .unwrap_or(&FEN_START_POSITION.to_string())
            .clone()
    }

    pub fn time(&self) -> i64 {
        *self
            .arguments
            .get_one::<i64>(CmdLineArgs::TIME_LONG)
            .unwrap_or(&CmdLineArgs::TIME_DEFAULT)
    }

    pub fn depth(&self) -> i32 {
        *self
            .arguments
            .get_one::<i32>(CmdLineArgs::DEPTH_LONG)
            .unwrap_or(&CmdLineArgs::DEPTH_DEFAULT)
    }

    pub fn mate(&self) -> Option<u32> {
        self.arguments.get_one::<u32>(CmdLineArgs::MATE_LONG).copied()
    }

    pub fn noise(&self) -> u32 {
        *self
            .arguments
            .get_one::<u32>(CmdLineArgs::NOISE_LONG)
            .unwrap_or(&CmdLineArgs::NOISE_DEFAULT)
    }

    pub fn analysis(&self) -> bool {
        self.arguments.get_flag(CmdLineArgs::ANALYSIS_LONG)
    }

    pub fn hash(&self) -> usize {
        *self
            .arguments
            .get_one::<usize>(CmdLineArgs::HASH_LONG)
            .unwrap_or(&CmdLineArgs::HASH_DEFAULT)
    }

    fn get() -> ArgMatches {
        Command::new("pocketknight")
            .about("Embedded chess engine core, host build")
            .arg(
                Arg::new(CmdLineArgs::FEN_LONG)
                    .long(CmdLineArgs::FEN_LONG)
                    .short(CmdLineArgs::FEN_SHORT)
                    .help(CmdLineArgs::FEN_HELP)
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::TIME_LONG)
                    .long(CmdLineArgs::TIME_LONG)
                    .short(CmdLineArgs::TIME_SHORT)
                    .help(CmdLineArgs::TIME_HELP)
                    .value_parser(value_parser!(i64))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::DEPTH_LONG)
                    .long(CmdLineArgs::DEPTH_LONG)
                    .short(CmdLineArgs::DEPTH_SHORT)
                    .help(CmdLineArgs::DEPTH_HELP)
                    .value_parser(value_parser!(i32))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::MATE_LONG)
                    .long(CmdLineArgs::MATE_LONG)
                    .short(CmdLineArgs::MATE_SHORT)
                    .help(CmdLineArgs::MATE_HELP)
                    .value_parser(value_parser!(u32))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::NOISE_LONG)
                    .long(CmdLineArgs::NOISE_LONG)
                    .short(CmdLineArgs::NOISE_SHORT)
                    .help(CmdLineArgs::NOISE_HELP)
                    .value_parser(value_parser!(u32))
                    .num_args(1),
            )
            .arg(
                Arg::new(CmdLineArgs::ANALYSIS_LONG)
                    .long(CmdLineArgs::ANALYSIS_LONG)
                    .short(CmdLineArgs::ANALYSIS_SHORT)
                    .help(CmdLineArgs::ANALYSIS_HELP)
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(CmdLineArgs::HASH_LONG)
                    .long(CmdLineArgs::HASH_LONG)
                    .help(CmdLineArgs::HASH_HELP)
                    .value_parser(value_parser!(usize))
                    .num_args(1),
            )
            .get_matches()
    }
}

impl Default for CmdLine {
    fn default() -> Self {
        Self::new()
    }
}
