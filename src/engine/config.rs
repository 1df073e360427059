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

// The whole device configuration is bit-packed into one 64-bit word so
// that the persistence record stays a single fixed-size block. Every
// option is an enumerated field; the version lives in the top byte and
// an incompatible version resets to defaults.

pub const CONF_VERSION: u64 = 4;
const CONF_VERSION_OFFSET: u32 = 56;

macro_rules! config_field {
    ($get:ident, $set:ident, $ty:ty, $offset:expr, $bits:expr) => {
        pub fn $get(&self) -> $ty {
            ((self.word >> $offset) & ((1u64 << $bits) - 1)) as $ty
        }
        pub fn $set(&mut self, value: $ty) {
            let mask = ((1u64 << $bits) - 1) << $offset;
            self.word = (self.word & !mask) | (((value as u64) << $offset) & mask);
        }
    };
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Config {
    word: u64,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CompSide {
    None = 0,
    White = 1,
    Black = 2,
    Random = 3,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum GameMode {
    TimePerMove = 0,
    GameIn = 1,
    Tournament = 2,
    Analysis = 3,
    MateIn = 4,
}

impl Config {
    // Field layout, LSB first:
    //   bit 0       book on/off
    //   bits 1-2    computer side
    //   bits 3-5    game mode
    //   bits 6-8    time-per-move level
    //   bits 9-10   Fischer increment
    //   bit  11     player bonus
    //   bits 12-15  game-in total
    //   bits 16-17  tournament schedule
    //   bits 18-20  mate-in depth
    //   bits 21-22  user time factor
    //   bits 23-25  clock percentage
    //   bits 26-27  speaker
    //   bits 28-31  display contrast
    //   bits 32-35  eval noise
    //   bits 36-37  backlight
    //   bits 56-63  config version
    config_field!(book_enabled_raw, set_book_enabled_raw, u8, 0, 1);
    config_field!(comp_side_raw, set_comp_side_raw, u8, 1, 2);
    config_field!(game_mode_raw, set_game_mode_raw, u8, 3, 3);
    config_field!(tpm_level, set_tpm_level, u8, 6, 3);
    config_field!(fischer_level, set_fischer_level, u8, 9, 2);
    config_field!(player_bonus_raw, set_player_bonus_raw, u8, 11, 1);
    config_field!(game_in_level, set_game_in_level, u8, 12, 4);
    config_field!(tournament_level, set_tournament_level, u8, 16, 2);
    config_field!(mate_in_raw, set_mate_in_raw, u8, 18, 3);
    config_field!(time_factor_raw, set_time_factor_raw, u8, 21, 2);
    config_field!(clock_level, set_clock_level, u8, 23, 3);
    config_field!(speaker_level, set_speaker_level, u8, 26, 2);
    config_field!(contrast_level, set_contrast_level, u8, 28, 4);
    config_field!(noise_level_raw, set_noise_level_raw, u8, 32, 4);
    config_field!(backlight_level, set_backlight_level, u8, 36, 2);

    pub fn new() -> Self {
        let mut config = Self { word: 0 };
        config.word |= CONF_VERSION << CONF_VERSION_OFFSET;
        config.set_book_enabled_raw(1);
        config.set_game_mode_raw(GameMode::TimePerMove as u8);
        config.set_tpm_level(2); // 10 seconds per move
        config.set_clock_level(4); // 100% nominal speed
        config.set_contrast_level(5);
        config
    }

    /// Rebuild from a persisted word; incompatible versions reset to
    /// the defaults.
    pub fn from_word(word: u64) -> Self {
        if word >> CONF_VERSION_OFFSET != CONF_VERSION {
            return Self::new();
        }
        Self { word }
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    pub fn book_enabled(&self) -> bool {
        self.book_enabled_raw() != 0
    }

    pub fn comp_side(&self) -> CompSide {
        match self.comp_side_raw() {
            1 => CompSide::White,
            2 => CompSide::Black,
            3 => CompSide::Random,
            _ => CompSide::None,
        }
    }

    pub fn set_comp_side(&mut self, side: CompSide) {
        self.set_comp_side_raw(side as u8);
    }

    pub fn game_mode(&self) -> GameMode {
        match self.game_mode_raw() {
            1 => GameMode::GameIn,
            2 => GameMode::Tournament,
            3 => GameMode::Analysis,
            4 => GameMode::MateIn,
            _ => GameMode::TimePerMove,
        }
    }

    pub fn set_game_mode(&mut self, mode: GameMode) {
        self.set_game_mode_raw(mode as u8);
    }

    /// Seconds per move for the time-per-move mode.
    pub fn tpm_seconds(&self) -> u32 {
        const LEVELS: [u32; 8] = [1, 5, 10, 20, 30, 60, 120, 180];
        LEVELS[self.tpm_level() as usize]
    }

    /// Fischer increment in seconds, 0 when off.
    pub fn fischer_seconds(&self) -> u32 {
        const LEVELS: [u32; 4] = [0, 10, 20, 30];
        LEVELS[self.fischer_level() as usize]
    }

    /// Player bonus in seconds, 0 when off.
    pub fn player_bonus_seconds(&self) -> u32 {
        self.player_bonus_raw() as u32 * 10
    }

    /// Total minutes for the game-in mode.
    pub fn game_in_minutes(&self) -> u32 {
        const LEVELS: [u32; 9] = [5, 10, 15, 20, 30, 45, 60, 90, 90];
        LEVELS[(self.game_in_level() as usize).min(8)]
    }

    /// Tournament schedule: (moves, minutes, rest-minutes, extra).
    pub fn tournament_schedule(&self) -> &'static str {
        const LEVELS: [&str; 4] = ["40/90+30", "40/120+30", "40/120+60", "40/120+20/60+30"];
        LEVELS[self.tournament_level() as usize]
    }

    /// Mate search depth in moves (1..=8).
    pub fn mate_in_moves(&self) -> u32 {
        self.mate_in_raw() as u32 + 1
    }

    pub fn set_mate_in_moves(&mut self, moves: u32) {
        self.set_mate_in_raw((moves.clamp(1, 8) - 1) as u8);
    }

    /// User time factor 1x..4x.
    pub fn time_factor(&self) -> u32 {
        self.time_factor_raw() as u32 + 1
    }

    /// CPU clock in percent of nominal.
    pub fn clock_percent(&self) -> u32 {
        const LEVELS: [u32; 8] = [10, 25, 50, 70, 100, 130, 145, 145];
        LEVELS[(self.clock_level() as usize).min(7)]
    }

    /// Display contrast in percent, 10% steps.
    pub fn contrast_percent(&self) -> u32 {
        (self.contrast_level() as u32).min(10) * 10
    }

    /// Eval noise in percent, 10% steps.
    pub fn noise_percent(&self) -> u32 {
        (self.noise_level_raw() as u32).min(10) * 10
    }

    pub fn set_noise_percent(&mut self, percent: u32) {
        self.set_noise_level_raw((percent.min(100) / 10) as u8);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
