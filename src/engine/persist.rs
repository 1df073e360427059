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

// Game persistence: one fixed-size record {backup, crc32}. Save writes
// the full structure at once, then the CRC; load verifies the CRC over
// the backup bytes and treats a mismatch as "no saved game". There are
// no partial updates.

use crate::defs::MAX_GAME_MOVES;
use crate::misc::crc::crc32;
use crate::movegen::defs::CMove;

/// Clock bookkeeping of both players at save time.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct TimeKeeping {
    pub white_ms: i64,
    pub black_ms: i64,
    /// Moves played in the current tournament period.
    pub period_moves: u16,
    pub period: u8,
}

#[derive(Clone, PartialEq, Debug)]
pub struct GameBackup {
    pub config_word: u64,
    pub prng_state: u64,
    pub autosave: bool,
    pub time_keeping: TimeKeeping,
    pub menu_state: u8,
    pub hmi_state: u8,
    /// Full move history, compressed moves.
    pub history: Vec<CMove>,
}

// Record layout: fixed header, fixed-capacity history area, CRC-32.
const HEADER_BYTES: usize = 8 + 8 + 1 + 8 + 8 + 2 + 1 + 1 + 1 + 2;
const HISTORY_BYTES: usize = 2 * MAX_GAME_MOVES;
pub const BACKUP_BYTES: usize = HEADER_BYTES + HISTORY_BYTES;
pub const RECORD_BYTES: usize = BACKUP_BYTES + 4;

impl GameBackup {
    pub fn new() -> Self {
        Self {
            config_word: 0,
            prng_state: 0,
            autosave: false,
            time_keeping: TimeKeeping::default(),
            menu_state: 0,
            hmi_state: 0,
            history: Vec::new(),
        }
    }

    fn to_backup_bytes(&self) -> [u8; BACKUP_BYTES] {
        let mut bytes = [0u8; BACKUP_BYTES];
        let mut at = 0;
        let mut put = |src: &[u8], at: &mut usize| {
            bytes[*at..*at + src.len()].copy_from_slice(src);
            *at += src.len();
        };
        put(&self.config_word.to_le_bytes(), &mut at);
        put(&self.prng_state.to_le_bytes(), &mut at);
        put(&[self.autosave as u8], &mut at);
        put(&self.time_keeping.white_ms.to_le_bytes(), &mut at);
        put(&self.time_keeping.black_ms.to_le_bytes(), &mut at);
        put(&self.time_keeping.period_moves.to_le_bytes(), &mut at);
        put(&[self.time_keeping.period], &mut at);
        put(&[self.menu_state], &mut at);
        put(&[self.hmi_state], &mut at);
        let count = self.history.len().min(MAX_GAME_MOVES) as u16;
        put(&count.to_le_bytes(), &mut at);
        for cmove in self.history.iter().take(MAX_GAME_MOVES) {
            put(&cmove.raw().to_le_bytes(), &mut at);
        }
        bytes
    }

    /// Serialize the full record including the trailing CRC-32.
    pub fn save(&self) -> Vec<u8> {
        let backup = self.to_backup_bytes();
        let mut record = Vec::with_capacity(RECORD_BYTES);
        record.extend_from_slice(&backup);
        record.extend_from_slice(&crc32(&backup).to_le_bytes());
        record
    }

    /// Load and verify a record; any mismatch means "empty".
    pub fn load(record: &[u8]) -> Option<Self> {
        if record.len() != RECORD_BYTES {
            return None;
        }
        let (backup, crc_bytes) = record.split_at(BACKUP_BYTES);
        let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        if crc32(backup) != stored {
            return None;
        }

        let mut at = 0usize;
        let take = |n: usize, at: &mut usize| {
            let slice = &backup[*at..*at + n];
            *at += n;
            slice
        };
        let config_word = u64::from_le_bytes(take(8, &mut at).try_into().unwrap());
        let prng_state = u64::from_le_bytes(take(8, &mut at).try_into().unwrap());
        let autosave = take(1, &mut at)[0] != 0;
        let white_ms = i64::from_le_bytes(take(8, &mut at).try_into().unwrap());
        let black_ms = i64::from_le_bytes(take(8, &mut at).try_into().unwrap());
        let period_moves = u16::from_le_bytes(take(2, &mut at).try_into().unwrap());
        let period = take(1, &mut at)[0];
        let menu_state = take(1, &mut at)[0];
        let hmi_state = take(1, &mut at)[0];
        let count = u16::from_le_bytes(take(2, &mut at).try_into().unwrap()) as usize;
        if count > MAX_GAME_MOVES {
            return None;
        }
        let mut history = Vec::with_capacity(count);
        for _ in 0..count {
            let raw = u16::from_le_bytes(take(2, &mut at).try_into().unwrap());
            history.push(CMove::from_raw(raw));
        }

        Some(Self {
            config_word,
            prng_state,
            autosave,
            time_keeping: TimeKeeping {
                white_ms,
                black_ms,
                period_moves,
                period,
            },
            menu_state,
            hmi_state,
            history,
        })
    }
}

impl Default for GameBackup {
    fn default() -> Self {
        Self::new()
    }
}
