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

pub mod defs;

use self::defs::{mvv_lva, CMove, Move, MoveFlags, MoveList, OrderVal};
use crate::board::defs::{
    is_black, kind_of, Arena, GFlags, Kinds, Pieces, Squares, BISHOP_DIRS, KNIGHT_JUMPS,
    QUEEN_DIRS, ROOK_DIRS, ROW_NUM,
};
use crate::board::Board;
use crate::defs::{NrOf, Piece, Side, Sides, Square, CHECK_LIST_LEN, MAX_DEPTH};

/// Handshake result between check detection and evasion generation.
/// The first `checkers` entries of the scratch buffer are the squares
/// of the checking pieces; entries up to `targets` are the squares on
/// the check ray that a blocker could occupy (single checker only).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheckInfo {
    pub checkers: usize,
    pub targets: usize,
}

impl CheckInfo {
    pub const NONE: CheckInfo = CheckInfo {
        checkers: 0,
        targets: 0,
    };
}

/// Killer and history hints for quiet-move pre-ordering.
pub struct OrderHints<'a> {
    pub killer0: CMove,
    pub killer1: CMove,
    pub history: &'a [[i32; NrOf::CELLS]; 8],
}

// The generator itself is stateless; all tables it needs are const.
// It stays a struct so the engine wires it up like any other module.
pub struct MoveGenerator {}

impl MoveGenerator {
    pub fn new() -> Self {
        Self {}
    }

    // ===================================================================
    // Full pseudo-legal generation
    // ===================================================================

    /// Generate all pseudo-legal moves for `side`. Legality regarding
    /// the own king is left to the caller (trial make + check test).
    /// Also refreshes the mobility counters of the moving side.
    pub fn generate_all(
        &self,
        board: &mut Board,
        side: Side,
        list: &mut MoveList,
        underprom: bool,
        hints: Option<&OrderHints>,
    ) {
        list.truncate(0);
        self.add_castling_moves(board, side, list);

        // Fixed scratch for the arena indices; the generator must not
        // allocate at steady state.
        let mut piece_indices = [Arena::NONE; 16];
        let mut pieces = 0;
        for idx in board.side_pieces(side) {
            piece_indices[pieces] = idx;
            pieces += 1;
        }
        for &idx in piece_indices[..pieces].iter() {
            let rec = *board.rec(idx);
            let from = rec.square;
            let start = list.len();
            match kind_of(rec.piece) {
                Kinds::PAWN => self.add_pawn_moves(board, side, from, list, underprom, false),
                Kinds::KNIGHT => self.add_leaper_moves(board, side, from, &KNIGHT_JUMPS, list),
                Kinds::BISHOP => self.add_slider_moves(board, side, from, &BISHOP_DIRS, list),
                Kinds::ROOK => self.add_slider_moves(board, side, from, &ROOK_DIRS, list),
                Kinds::QUEEN => self.add_slider_moves(board, side, from, &QUEEN_DIRS, list),
                _ => {}
            }
            if kind_of(rec.piece) != Kinds::PAWN {
                board.rec_mut(idx).mobility = (list.len() - start).min(127) as i8;
            }
        }

        let king_start = list.len();
        self.add_king_moves(board, side, list);
        let king_idx = board.cells[board.king_square(side)];
        board.rec_mut(king_idx).mobility = (list.len() - king_start).min(127) as i8;

        if let Some(hints) = hints {
            self.apply_order_hints(board, list, hints);
        }
    }

    /// Captures and promotions only, for the quiescence search.
    pub fn generate_captures_and_promotions(
        &self,
        board: &Board,
        side: Side,
        list: &mut MoveList,
        underprom: bool,
    ) {
        list.truncate(0);
        for idx in board.side_pieces(side) {
            let rec = *board.rec(idx);
            let from = rec.square;
            match kind_of(rec.piece) {
                Kinds::PAWN => self.add_pawn_moves(board, side, from, list, underprom, true),
                Kinds::KNIGHT => self.add_leaper_captures(board, side, from, &KNIGHT_JUMPS, list),
                Kinds::BISHOP => self.add_slider_captures(board, side, from, &BISHOP_DIRS, list),
                Kinds::ROOK => self.add_slider_captures(board, side, from, &ROOK_DIRS, list),
                Kinds::QUEEN => self.add_slider_captures(board, side, from, &QUEEN_DIRS, list),
                _ => {}
            }
        }
        let king = board.king_square(side);
        self.add_leaper_captures(board, side, king, &QUEEN_DIRS, list);
    }

    /// King moves only; used by the quiescence stalemate probe.
    pub fn generate_king_moves(&self, board: &Board, side: Side, list: &mut MoveList) {
        list.truncate(0);
        self.add_king_moves(board, side, list);
    }

    // ===================================================================
    // Evasions
    // ===================================================================

    /// When in check: king moves, captures of the single checker, and
    /// blocks on the check ray. With two checkers, king moves only.
    pub fn generate_evasions(
        &self,
        board: &Board,
        side: Side,
        buf: &[Square; CHECK_LIST_LEN],
        info: CheckInfo,
        list: &mut MoveList,
        underprom: bool,
    ) {
        list.truncate(0);
        self.add_king_moves(board, side, list);

        if info.checkers != 1 {
            return;
        }
        let checker_sq = buf[0];

        for idx in board.side_pieces(side) {
            let rec = *board.rec(idx);
            let from = rec.square;
            let kind = kind_of(rec.piece);

            // Captures of the checker.
            if kind == Kinds::PAWN {
                self.add_pawn_evasions(board, side, from, checker_sq, buf, info, list, underprom);
                continue;
            }
            if self.piece_reaches(board, kind, from, checker_sq) {
                let victim = kind_of(board.piece_at(checker_sq));
                list.push(Move::new(
                    from,
                    checker_sq,
                    MoveFlags::NORMAL,
                    mvv_lva(victim, kind),
                ));
            }
            // Blocks on the ray.
            for t in info.checkers..info.targets {
                let target = buf[t];
                if self.piece_reaches(board, kind, from, target) {
                    list.push(Move::new(from, target, MoveFlags::NORMAL, OrderVal::QUIET));
                }
            }
        }
    }

    // ===================================================================
    // Check detection
    // ===================================================================

    /// Is a square attacked by `by`? The attack detector is also used
    /// for the castling pass-through test, without a trial make.
    pub fn square_attacked(&self, board: &Board, by: Side, sq: Square) -> bool {
        let (pawn, knight, bishop, rook, queen, king) = side_pieces_of(by);

        // Pawns: a white pawn on sq-9/sq-11 attacks sq.
        if by == Sides::WHITE {
            if board.piece_at(sq - 9) == pawn || board.piece_at(sq - 11) == pawn {
                return true;
            }
        } else if board.piece_at(sq + 9) == pawn || board.piece_at(sq + 11) == pawn {
            return true;
        }

        for &jump in KNIGHT_JUMPS.iter() {
            if board.piece_at(offset(sq, jump)) == knight {
                return true;
            }
        }
        for &dir in QUEEN_DIRS.iter() {
            if board.piece_at(offset(sq, dir)) == king {
                return true;
            }
        }
        for &dir in ROOK_DIRS.iter() {
            let piece = self.first_piece_on_ray(board, sq, dir);
            if piece == rook || piece == queen {
                return true;
            }
        }
        for &dir in BISHOP_DIRS.iter() {
            let piece = self.first_piece_on_ray(board, sq, dir);
            if piece == bishop || piece == queen {
                return true;
            }
        }
        false
    }

    pub fn king_in_check(&self, board: &Board, side: Side) -> bool {
        self.square_attacked(board, side ^ 1, board.king_square(side))
    }

    /// Uncapped attacker count on a square; the position editor uses
    /// it to reject fantasy setups with more than two checkers.
    pub fn count_attackers(&self, board: &Board, by: Side, sq: Square) -> usize {
        let (pawn, knight, bishop, rook, queen, king) = side_pieces_of(by);
        let mut count = 0;
        if by == Sides::WHITE {
            count += usize::from(board.piece_at(sq - 9) == pawn);
            count += usize::from(board.piece_at(sq - 11) == pawn);
        } else {
            count += usize::from(board.piece_at(sq + 9) == pawn);
            count += usize::from(board.piece_at(sq + 11) == pawn);
        }
        for &jump in KNIGHT_JUMPS.iter() {
            count += usize::from(board.piece_at(offset(sq, jump)) == knight);
        }
        for &dir in QUEEN_DIRS.iter() {
            count += usize::from(board.piece_at(offset(sq, dir)) == king);
            let piece = self.first_piece_on_ray(board, sq, dir);
            let is_rook_dir = dir.abs() == 1 || dir.abs() == 10;
            if piece == queen
                || (is_rook_dir && piece == rook)
                || (!is_rook_dir && piece == bishop)
            {
                count += 1;
            }
        }
        count
    }

    /// Full check analysis filling the attackers/blocks scratch buffer.
    pub fn king_in_check_info(
        &self,
        board: &Board,
        side: Side,
        buf: &mut [Square; CHECK_LIST_LEN],
    ) -> CheckInfo {
        let sq = board.king_square(side);
        let by = side ^ 1;
        let (pawn, knight, bishop, rook, queen, _king) = side_pieces_of(by);
        let mut checkers = 0;
        let mut rays: [(Square, isize); 2] = [(0, 0); 2];

        if by == Sides::WHITE {
            for d in [9isize, 11] {
                let s = (sq as isize - d) as Square;
                if board.piece_at(s) == pawn && checkers < 2 {
                    buf[checkers] = s;
                    checkers += 1;
                }
            }
        } else {
            for d in [9isize, 11] {
                let s = sq + d as Square;
                if board.piece_at(s) == pawn && checkers < 2 {
                    buf[checkers] = s;
                    checkers += 1;
                }
            }
        }
        for &jump in KNIGHT_JUMPS.iter() {
            let s = offset(sq, jump);
            if board.piece_at(s) == knight && checkers < 2 {
                buf[checkers] = s;
                checkers += 1;
            }
        }
        for &dir in QUEEN_DIRS.iter() {
            let is_rook_dir = dir.abs() == 1 || dir.abs() == 10;
            let mut s = offset(sq, dir);
            while board.piece_at(s) == Pieces::NONE {
                s = offset(s, dir);
            }
            let piece = board.piece_at(s);
            let hit = piece == queen || (is_rook_dir && piece == rook)
                || (!is_rook_dir && piece == bishop);
            if hit && checkers < 2 {
                rays[checkers] = (s, dir);
                buf[checkers] = s;
                checkers += 1;
            }
        }

        let mut targets = checkers;
        // Blocking squares only matter against a single sliding checker.
        if checkers == 1 && rays[0].1 != 0 {
            let (checker_sq, dir) = rays[0];
            let mut s = offset(sq, dir);
            while s != checker_sq && targets < CHECK_LIST_LEN {
                buf[targets] = s;
                targets += 1;
                s = offset(s, dir);
            }
        }

        CheckInfo { checkers, targets }
    }

    /// Cheap sanity check for a move retrieved from the hash table:
    /// own piece on the from-square, target not own, path clear.
    pub fn pseudo_legal(&self, board: &Board, m: Move, side: Side) -> bool {
        if m.is_none() {
            return false;
        }
        let from = m.from();
        let to = m.to();
        let piece = board.piece_at(from);
        if piece <= Pieces::EDGE || side_of(piece) != side {
            return false;
        }
        let target = board.piece_at(to);
        if target == Pieces::EDGE
            || (target != Pieces::NONE && side_of(target) == side)
        {
            return false;
        }
        let kind = kind_of(piece);
        let diff = to as isize - from as isize;
        match kind {
            Kinds::PAWN => {
                let forward: isize = if side == Sides::WHITE { 10 } else { -10 };
                if diff == forward {
                    return target == Pieces::NONE;
                }
                if diff == 2 * forward {
                    let start_rank = if side == Sides::WHITE { 2 } else { 7 };
                    return ROW_NUM[from] == start_rank
                        && target == Pieces::NONE
                        && board.piece_at(offset(from, forward)) == Pieces::NONE;
                }
                if diff == forward - 1 || diff == forward + 1 {
                    return target != Pieces::NONE || board.game_state.en_passant == to;
                }
                false
            }
            Kinds::KNIGHT => KNIGHT_JUMPS.contains(&diff),
            Kinds::KING => {
                if QUEEN_DIRS.contains(&diff) {
                    return true;
                }
                // Castling geometry; full legality is re-checked by the
                // trial make plus the pass-through test at generation.
                diff.abs() == 2 && self.castle_pseudo_legal(board, side, to)
            }
            _ => {
                let dirs: &[isize] = match kind {
                    Kinds::BISHOP => &BISHOP_DIRS,
                    Kinds::ROOK => &ROOK_DIRS,
                    _ => &QUEEN_DIRS,
                };
                for &dir in dirs {
                    let mut s = offset(from, dir);
                    loop {
                        if s == to {
                            return true;
                        }
                        if board.piece_at(s) != Pieces::NONE {
                            break;
                        }
                        s = offset(s, dir);
                    }
                }
                false
            }
        }
    }

    // ===================================================================
    // Per-piece helpers
    // ===================================================================

    fn add_king_moves(&self, board: &Board, side: Side, list: &mut MoveList) {
        let from = board.king_square(side);
        for &dir in QUEEN_DIRS.iter() {
            let to = offset(from, dir);
            let target = board.piece_at(to);
            if target == Pieces::NONE {
                list.push(Move::new(from, to, MoveFlags::NORMAL, OrderVal::QUIET));
            } else if target != Pieces::EDGE && side_of(target) != side {
                list.push(Move::new(
                    from,
                    to,
                    MoveFlags::NORMAL,
                    mvv_lva(kind_of(target), Kinds::KING),
                ));
            }
        }
    }

    fn add_castling_moves(&self, board: &Board, side: Side, list: &mut MoveList) {
        let gflags = board.game_state.gflags;
        let enemy = side ^ 1;
        if side == Sides::WHITE {
            if gflags & (GFlags::WKMOVED | GFlags::WRH1MOVED) == 0
                && board.piece_at(Squares::H1) == Pieces::WROOK
                && board.piece_at(Squares::F1) == Pieces::NONE
                && board.piece_at(Squares::G1) == Pieces::NONE
                && !self.square_attacked(board, enemy, Squares::E1)
                && !self.square_attacked(board, enemy, Squares::F1)
                && !self.square_attacked(board, enemy, Squares::G1)
            {
                list.push(Move::new(
                    Squares::E1,
                    Squares::G1,
                    MoveFlags::NORMAL,
                    OrderVal::QUIET,
                ));
            }
            if gflags & (GFlags::WKMOVED | GFlags::WRA1MOVED) == 0
                && board.piece_at(Squares::A1) == Pieces::WROOK
                && board.piece_at(Squares::B1) == Pieces::NONE
                && board.piece_at(Squares::C1) == Pieces::NONE
                && board.piece_at(Squares::D1) == Pieces::NONE
                && !self.square_attacked(board, enemy, Squares::E1)
                && !self.square_attacked(board, enemy, Squares::D1)
                && !self.square_attacked(board, enemy, Squares::C1)
            {
                list.push(Move::new(
                    Squares::E1,
                    Squares::C1,
                    MoveFlags::NORMAL,
                    OrderVal::QUIET,
                ));
            }
        } else {
            if gflags & (GFlags::BKMOVED | GFlags::BRH8MOVED) == 0
                && board.piece_at(Squares::H8) == Pieces::BROOK
                && board.piece_at(Squares::F8) == Pieces::NONE
                && board.piece_at(Squares::G8) == Pieces::NONE
                && !self.square_attacked(board, enemy, Squares::E8)
                && !self.square_attacked(board, enemy, Squares::F8)
                && !self.square_attacked(board, enemy, Squares::G8)
            {
                list.push(Move::new(
                    Squares::E8,
                    Squares::G8,
                    MoveFlags::NORMAL,
                    OrderVal::QUIET,
                ));
            }
            if gflags & (GFlags::BKMOVED | GFlags::BRA8MOVED) == 0
                && board.piece_at(Squares::A8) == Pieces::BROOK
                && board.piece_at(Squares::B8) == Pieces::NONE
                && board.piece_at(Squares::C8) == Pieces::NONE
                && board.piece_at(Squares::D8) == Pieces::NONE
                && !self.square_attacked(board, enemy, Squares::E8)
                && !self.square_attacked(board, enemy, Squares::D8)
                && !self.square_attacked(board, enemy, Squares::C8)
            {
                list.push(Move::new(
                    Squares::E8,
                    Squares::C8,
                    MoveFlags::NORMAL,
                    OrderVal::QUIET,
                ));
            }
        }
    }

    fn add_leaper_moves(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        jumps: &[isize],
        list: &mut MoveList,
    ) {
        let attacker = kind_of(board.piece_at(from));
        for &jump in jumps {
            let to = offset(from, jump);
            let target = board.piece_at(to);
            if target == Pieces::NONE {
                list.push(Move::new(from, to, MoveFlags::NORMAL, OrderVal::QUIET));
            } else if target != Pieces::EDGE && side_of(target) != side {
                list.push(Move::new(
                    from,
                    to,
                    MoveFlags::NORMAL,
                    mvv_lva(kind_of(target), attacker),
                ));
            }
        }
    }

    fn add_leaper_captures(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        jumps: &[isize],
        list: &mut MoveList,
    ) {
        let attacker = kind_of(board.piece_at(from));
        for &jump in jumps {
            let to = offset(from, jump);
            let target = board.piece_at(to);
            if target > Pieces::EDGE && side_of(target) != side {
                list.push(Move::new(
                    from,
                    to,
                    MoveFlags::NORMAL,
                    mvv_lva(kind_of(target), attacker),
                ));
            }
        }
    }

    fn add_slider_moves(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        dirs: &[isize],
        list: &mut MoveList,
    ) {
        let attacker = kind_of(board.piece_at(from));
        for &dir in dirs {
            let mut to = offset(from, dir);
            while board.piece_at(to) == Pieces::NONE {
                list.push(Move::new(from, to, MoveFlags::NORMAL, OrderVal::QUIET));
                to = offset(to, dir);
            }
            let target = board.piece_at(to);
            if target != Pieces::EDGE && side_of(target) != side {
                list.push(Move::new(
                    from,
                    to,
                    MoveFlags::NORMAL,
                    mvv_lva(kind_of(target), attacker),
                ));
            }
        }
    }

    fn add_slider_captures(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        dirs: &[isize],
        list: &mut MoveList,
    ) {
        let attacker = kind_of(board.piece_at(from));
        for &dir in dirs {
            let piece = self.first_piece_on_ray_from(board, from, dir);
            let (target_sq, target) = piece;
            if target != Pieces::EDGE && target != Pieces::NONE && side_of(target) != side {
                list.push(Move::new(
                    from,
                    target_sq,
                    MoveFlags::NORMAL,
                    mvv_lva(kind_of(target), attacker),
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_pawn_moves(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        list: &mut MoveList,
        underprom: bool,
        captures_only: bool,
    ) {
        let (forward, pawn_flag, promo_rank, start_rank): (isize, Piece, usize, usize) =
            if side == Sides::WHITE {
                (10, Pieces::WPAWN, 8, 2)
            } else {
                (-10, Pieces::BPAWN, 1, 7)
            };
        let promotes = ROW_NUM[from] == if side == Sides::WHITE { 7 } else { 2 };

        // Pushes.
        let one = offset(from, forward);
        if !captures_only || promotes {
            if board.piece_at(one) == Pieces::NONE {
                if promotes {
                    self.push_promotions(side, from, one, Kinds::PAWN, underprom, list);
                } else if !captures_only {
                    list.push(Move::new(from, one, pawn_flag, OrderVal::QUIET));
                }
            }
        }
        if !captures_only
            && ROW_NUM[from] == start_rank
            && board.piece_at(one) == Pieces::NONE
        {
            let two = offset(one, forward);
            if board.piece_at(two) == Pieces::NONE {
                list.push(Move::new(from, two, pawn_flag, OrderVal::QUIET));
            }
        }

        // Captures, including en passant.
        for side_step in [forward - 1, forward + 1] {
            let to = offset(from, side_step);
            let target = board.piece_at(to);
            if target > Pieces::EDGE && side_of(target) != side {
                if promotes {
                    self.push_promotions(side, from, to, kind_of(target), underprom, list);
                } else {
                    list.push(Move::new(
                        from,
                        to,
                        pawn_flag,
                        mvv_lva(kind_of(target), Kinds::PAWN),
                    ));
                }
            } else if to != 0 && board.game_state.en_passant == to {
                list.push(Move::new(
                    from,
                    to,
                    pawn_flag,
                    mvv_lva(Kinds::PAWN, Kinds::PAWN),
                ));
            }
        }
        debug_assert!(ROW_NUM[from] != promo_rank);
    }

    fn push_promotions(
        &self,
        side: Side,
        from: Square,
        to: Square,
        victim: Piece,
        underprom: bool,
        list: &mut MoveList,
    ) {
        let base = if side == Sides::WHITE { 0 } else { 8 };
        list.push(Move::new(
            from,
            to,
            Pieces::WQUEEN + base,
            mvv_lva(Kinds::QUEEN, Kinds::PAWN).max(mvv_lva(victim.max(Kinds::PAWN), Kinds::PAWN)),
        ));
        if underprom {
            for kind in [Kinds::ROOK, Kinds::BISHOP, Kinds::KNIGHT] {
                list.push(Move::new(
                    from,
                    to,
                    kind + base,
                    mvv_lva(kind, Kinds::PAWN),
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_pawn_evasions(
        &self,
        board: &Board,
        side: Side,
        from: Square,
        checker_sq: Square,
        buf: &[Square; CHECK_LIST_LEN],
        info: CheckInfo,
        list: &mut MoveList,
        underprom: bool,
    ) {
        let forward: isize = if side == Sides::WHITE { 10 } else { -10 };
        let pawn_flag = if side == Sides::WHITE {
            Pieces::WPAWN
        } else {
            Pieces::BPAWN
        };
        let promotes = ROW_NUM[from] == if side == Sides::WHITE { 7 } else { 2 };

        // Capture the checker.
        for side_step in [forward - 1, forward + 1] {
            let to = offset(from, side_step);
            if to == checker_sq {
                if promotes {
                    self.push_promotions(
                        side,
                        from,
                        to,
                        kind_of(board.piece_at(to)),
                        underprom,
                        list,
                    );
                } else {
                    list.push(Move::new(
                        from,
                        to,
                        pawn_flag,
                        mvv_lva(kind_of(board.piece_at(to)), Kinds::PAWN),
                    ));
                }
            } else if board.game_state.en_passant == to
                && checker_sq == offset(to, -forward)
            {
                // The double-pushed checker can be taken en passant.
                list.push(Move::new(
                    from,
                    to,
                    pawn_flag,
                    mvv_lva(Kinds::PAWN, Kinds::PAWN),
                ));
            }
        }

        // Block the check ray with a push.
        let one = offset(from, forward);
        if board.piece_at(one) == Pieces::NONE {
            let start_rank = if side == Sides::WHITE { 2 } else { 7 };
            for t in info.checkers..info.targets {
                if buf[t] == one {
                    if promotes {
                        self.push_promotions(side, from, one, Kinds::PAWN, underprom, list);
                    } else {
                        list.push(Move::new(from, one, pawn_flag, OrderVal::QUIET));
                    }
                }
            }
            if ROW_NUM[from] == start_rank {
                let two = offset(one, forward);
                if board.piece_at(two) == Pieces::NONE {
                    for t in info.checkers..info.targets {
                        if buf[t] == two {
                            list.push(Move::new(from, two, pawn_flag, OrderVal::QUIET));
                        }
                    }
                }
            }
        }
    }

    /// Can a non-pawn, non-king piece of this kind reach the target in
    /// one move on the current board?
    fn piece_reaches(&self, board: &Board, kind: Piece, from: Square, to: Square) -> bool {
        match kind {
            Kinds::KNIGHT => KNIGHT_JUMPS.contains(&(to as isize - from as isize)),
            Kinds::BISHOP | Kinds::ROOK | Kinds::QUEEN => {
                let dirs: &[isize] = match kind {
                    Kinds::BISHOP => &BISHOP_DIRS,
                    Kinds::ROOK => &ROOK_DIRS,
                    _ => &QUEEN_DIRS,
                };
                for &dir in dirs {
                    let mut s = offset(from, dir);
                    loop {
                        if s == to {
                            return true;
                        }
                        if board.piece_at(s) != Pieces::NONE {
                            break;
                        }
                        s = offset(s, dir);
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn first_piece_on_ray(&self, board: &Board, from: Square, dir: isize) -> Piece {
        self.first_piece_on_ray_from(board, from, dir).1
    }

    fn first_piece_on_ray_from(
        &self,
        board: &Board,
        from: Square,
        dir: isize,
    ) -> (Square, Piece) {
        let mut s = offset(from, dir);
        while board.piece_at(s) == Pieces::NONE {
            s = offset(s, dir);
        }
        (s, board.piece_at(s))
    }

    fn castle_pseudo_legal(&self, board: &Board, side: Side, to: Square) -> bool {
        let mut list = MoveList::new();
        self.add_castling_moves(board, side, &mut list);
        let found = list.iter().any(|m| m.to() == to);
        found
    }

    // Boost killers and well-performing quiet moves; captures keep
    // their victim/attacker score.
    fn apply_order_hints(&self, board: &Board, list: &mut MoveList, hints: &OrderHints) {
        for m in list.slice_mut().iter_mut() {
            if m.order() >= OrderVal::TACTICAL {
                continue;
            }
            let cmove = m.compress();
            if cmove == hints.killer0 {
                m.set_order(OrderVal::KILLER_0);
            } else if cmove == hints.killer1 {
                m.set_order(OrderVal::KILLER_1);
            } else {
                let kind = kind_of(board.piece_at(m.from()));
                let hist = hints.history[kind][m.to()];
                if hist != 0 {
                    let boost = (MAX_DEPTH + hist).max(0) as u8;
                    m.set_order(OrderVal::QUIET + boost);
                }
            }
        }
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Colour of a piece type; only valid for real pieces.
fn side_of(piece: Piece) -> Side {
    if is_black(piece) {
        Sides::BLACK
    } else {
        Sides::WHITE
    }
}

fn side_pieces_of(side: Side) -> (Piece, Piece, Piece, Piece, Piece, Piece) {
    if side == Sides::WHITE {
        (
            Pieces::WPAWN,
            Pieces::WKNIGHT,
            Pieces::WBISHOP,
            Pieces::WROOK,
            Pieces::WQUEEN,
            Pieces::WKING,
        )
    } else {
        (
            Pieces::BPAWN,
            Pieces::BKNIGHT,
            Pieces::BBISHOP,
            Pieces::BROOK,
            Pieces::BQUEEN,
            Pieces::BKING,
        )
    }
}

fn offset(sq: Square, diff: isize) -> Square {
    (sq as isize + diff) as Square
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::FEN_START_POSITION;

    fn legal_move_count(board: &mut Board, mg: &MoveGenerator) -> usize {
        let side = board.us();
        let mut list = MoveList::new();
        let mut buf = [0; CHECK_LIST_LEN];
        if mg.king_in_check(board, side) {
            let info = mg.king_in_check_info(board, side, &mut buf);
            mg.generate_evasions(board, side, &buf, info, &mut list, true);
        } else {
            mg.generate_all(board, side, &mut list, true, None);
        }

        let mut legal = 0;
        for i in 0..list.len() {
            board.make(list.get(i));
            if !mg.king_in_check(board, side) {
                legal += 1;
            }
            board.unmake();
        }
        legal
    }

    #[test]
    fn twenty_moves_in_the_initial_position() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        assert_eq!(legal_move_count(&mut board, &mg), 20);
    }

    #[test]
    fn kiwipete_has_48_legal_moves() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board
            .fen_read(Some(
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            ))
            .unwrap();
        assert_eq!(legal_move_count(&mut board, &mg), 48);
    }

    #[test]
    fn evasions_match_filtered_full_generation() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        // White king in check from a rook; compare evasion output with
        // the full list filtered by trial make.
        board
            .fen_read(Some("4r1k1/8/8/8/8/8/3P4/2N1K2R w K - 0 1"))
            .unwrap();
        let side = board.us();
        assert!(mg.king_in_check(&board, side));

        let mut buf = [0; CHECK_LIST_LEN];
        let info = mg.king_in_check_info(&board, side, &mut buf);
        assert_eq!(info.checkers, 1);

        let mut evasions = MoveList::new();
        mg.generate_evasions(&board, side, &buf, info, &mut evasions, true);

        let mut all = MoveList::new();
        mg.generate_all(&mut board, side, &mut all, true, None);

        let legal = |board: &mut Board, m: Move| {
            board.make(m);
            let ok = !mg.king_in_check(board, side);
            board.unmake();
            ok
        };

        let mut legal_evasions: Vec<String> = (0..evasions.len())
            .map(|i| evasions.get(i))
            .filter(|&m| legal(&mut board, m))
            .map(|m| m.as_string())
            .collect();
        let mut legal_all: Vec<String> = (0..all.len())
            .map(|i| all.get(i))
            .filter(|&m| legal(&mut board, m))
            .map(|m| m.as_string())
            .collect();
        legal_evasions.sort();
        legal_all.sort();
        assert_eq!(legal_evasions, legal_all);
        assert!(!legal_evasions.is_empty());
    }

    #[test]
    fn double_check_allows_king_moves_only() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board
            .fen_read(Some("4k3/8/8/8/8/5n2/4r3/4K2R w - - 0 1"))
            .unwrap();
        let mut buf = [0; CHECK_LIST_LEN];
        let info = mg.king_in_check_info(&board, Sides::WHITE, &mut buf);
        assert_eq!(info.checkers, 2);

        let mut evasions = MoveList::new();
        mg.generate_evasions(&board, Sides::WHITE, &buf, info, &mut evasions, true);
        for m in evasions.iter() {
            assert_eq!(m.from(), board.king_square(Sides::WHITE));
        }
    }

    #[test]
    fn castling_blocked_through_attacked_square() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        // Black rook on f8 covers f1; kingside castling must not appear.
        board
            .fen_read(Some("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1"))
            .unwrap();
        let mut list = MoveList::new();
        mg.generate_all(&mut board, Sides::WHITE, &mut list, true, None);
        let has_short = list.iter().any(|m| m.as_string() == "e1g1");
        let has_long = list.iter().any(|m| m.as_string() == "e1c1");
        assert!(!has_short);
        assert!(has_long);
    }

    #[test]
    fn quiescence_capture_list_contains_only_captures_and_promotions() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board
            .fen_read(Some(
                "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
            ))
            .unwrap();
        let mut list = MoveList::new();
        mg.generate_captures_and_promotions(&board, Sides::WHITE, &mut list, false);
        assert!(list.len() >= 1);
        for m in list.iter() {
            assert!(m.order() >= OrderVal::TACTICAL);
        }
    }

    #[test]
    fn promotions_expand_to_four_with_underpromotions() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board
            .fen_read(Some("8/2P5/8/8/8/4k3/8/4K3 w - - 0 1"))
            .unwrap();
        let mut list = MoveList::new();
        mg.generate_all(&mut board, Sides::WHITE, &mut list, true, None);
        let promos = list.iter().filter(|m| m.as_string().starts_with("c7c8")).count();
        assert_eq!(promos, 4);

        mg.generate_captures_and_promotions(&board, Sides::WHITE, &mut list, false);
        let promos = list.iter().filter(|m| m.as_string().starts_with("c7c8")).count();
        assert_eq!(promos, 1);
    }

    #[test]
    fn mobility_counters_are_refreshed() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let mut list = MoveList::new();
        mg.generate_all(&mut board, Sides::WHITE, &mut list, true, None);

        // Each knight has two squares in the initial position; rooks none.
        for idx in board.side_pieces(Sides::WHITE).collect::<Vec<u8>>() {
            let rec = board.rec(idx);
            match kind_of(rec.piece) {
                Kinds::KNIGHT => assert_eq!(rec.mobility, 2),
                Kinds::ROOK => assert_eq!(rec.mobility, 0),
                _ => {}
            }
        }
    }

    #[test]
    fn killer_hint_boosts_quiet_move() {
        let mg = MoveGenerator::new();
        let mut board = Board::new();
        board.fen_read(Some(FEN_START_POSITION)).unwrap();
        let killer = Move::new(Squares::G1, Squares::F3, MoveFlags::NORMAL, 0).compress();
        let history = [[0i32; NrOf::CELLS]; 8];
        let hints = OrderHints {
            killer0: killer,
            killer1: CMove::NONE,
            history: &history,
        };
        let mut list = MoveList::new();
        mg.generate_all(&mut board, Sides::WHITE, &mut list, true, Some(&hints));
        let boosted = list
            .iter()
            .find(|m| m.as_string() == "g1f3")
            .expect("knight move present");
        assert_eq!(boosted.order(), OrderVal::KILLER_0);
    }
}
