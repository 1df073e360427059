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

use crate::movegen::defs::Move;
use crate::search::defs::PvLine;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

// This struct holds messages that are reported on fatal engine errors.
// These should never happen; if they do the engine is in an unknown
// state. On the embedded target the HMI shows the message and requests
// a reboot instead of corrupting the position further.
pub struct ErrFatal;
impl ErrFatal {
    pub const STACK_ASYMMETRY: &'static str = "Make/unmake asymmetry detected.";
    pub const CHANNEL: &'static str = "Broken report channel.";
    pub const BOOK_DATA: &'static str = "Opening book data corrupt.";
}

/// Outcome of a best-move request; no variant is an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchVerdict {
    /// A legal move was found.
    Move(Move),
    /// A legal move was found, but the score is below the resignation
    /// threshold. The move is still playable.
    Resign(Move),
    /// Side to move is checkmated.
    Mate,
    /// Side to move is stalemated.
    Stalemate,
    /// Draw by insufficient material.
    MaterialDraw,
}

/// Reason codes of the position editor; surfaced to the caller, which
/// decides how to display them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionError {
    TooManyPieces,
    KingInvalid,
    ChecksInvalid,
    TooManyMoves,
    TooManyCapts,
    TooManyChecks,
}

// Timeout handshake between the timer interrupt and the search. The
// flag is sticky: once set, every pending recursion returns its
// current alpha, and only the root clears it again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timeout {
    None = 0,
    TimeUp = 1,
    UserCancel = 2,
}

pub struct TimeoutCell(AtomicU8);

impl TimeoutCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(Timeout::None as u8))
    }

    pub fn get(&self) -> Timeout {
        match self.0.load(Ordering::Relaxed) {
            1 => Timeout::TimeUp,
            2 => Timeout::UserCancel,
            _ => Timeout::None,
        }
    }

    /// Set the timeout flag; a user cancel is never downgraded.
    pub fn set(&self, timeout: Timeout) {
        if timeout == Timeout::TimeUp && self.get() == Timeout::UserCancel {
            return;
        }
        self.0.store(timeout as u8, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(Timeout::None as u8, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed) != Timeout::None as u8
    }
}

impl Default for TimeoutCell {
    fn default() -> Self {
        Self::new()
    }
}

// The entire platform surface the core sees: a time-exhausted check, a
// soft-deadline query, the two status screens, and a random source.
// The HMI never calls back into the core.
pub trait Host {
    /// Hard deadline check; may account for dialogue time internally.
    fn time_exhausted(&mut self) -> bool;
    /// Milliseconds since the current move computation started.
    fn time_passed_ms(&self) -> i64;
    fn update_search_screen(&mut self, eval: i32, depth: i32, pv: &PvLine);
    fn update_analysis_screen(&mut self, time_ms: i64, eval: i32, depth: i32, pv: &PvLine);
    fn random(&mut self) -> u32;
}

// Host implementation for running on a normal operating system: wall
// clock deadline plus a small PRNG. The embedded target supplies its
// own implementation on top of the timer interrupt.
pub struct StdHost {
    start: Instant,
    pub budget_ms: i64,
    rng: rand::rngs::SmallRng,
}

impl StdHost {
    pub fn new(budget_ms: i64, rng_seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            start: Instant::now(),
            budget_ms,
            rng: rand::rngs::SmallRng::seed_from_u64(rng_seed),
        }
    }

    pub fn restart(&mut self, budget_ms: i64) {
        self.start = Instant::now();
        self.budget_ms = budget_ms;
    }
}

impl Host for StdHost {
    fn time_exhausted(&mut self) -> bool {
        self.time_passed_ms() >= self.budget_ms
    }

    fn time_passed_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    fn update_search_screen(&mut self, _eval: i32, _depth: i32, _pv: &PvLine) {}

    fn update_analysis_screen(&mut self, _time_ms: i64, _eval: i32, _depth: i32, _pv: &PvLine) {}

    fn random(&mut self) -> u32 {
        use rand::RngCore;
        self.rng.next_u32()
    }
}

/// Progress reports from the search driver, carried over a crossbeam
/// channel to whoever wants to display them.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchReport {
    /// Depth finished: (depth, score, pv).
    Iteration(i32, i32, PvLine),
    /// The search settled on a move.
    Finished(Move),
    InfoString(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_cell_is_sticky_for_user_cancel() {
        let cell = TimeoutCell::new();
        assert!(!cell.is_set());
        cell.set(Timeout::UserCancel);
        cell.set(Timeout::TimeUp);
        assert_eq!(cell.get(), Timeout::UserCancel);
        cell.clear();
        assert_eq!(cell.get(), Timeout::None);
        cell.set(Timeout::TimeUp);
        assert_eq!(cell.get(), Timeout::TimeUp);
    }

    #[test]
    fn std_host_deadline() {
        let mut host = StdHost::new(0, 42);
        assert!(host.time_exhausted());
        host.restart(60_000);
        assert!(!host.time_exhausted());
        let a = host.random();
        let b = host.random();
        assert_ne!(a, b);
    }
}
