//! Legal move generation, attack maps and check detection.
//!
//! Generation is two-phase: pseudo-legal moves per piece, then a legality
//! filter that plays each candidate on a scratch copy and rejects it when the
//! mover's king is left attacked.

use crate::board::{
    Color, Move, PieceKind, Position, Square, SquareSet, FLAG_CAPTURE, FLAG_CASTLE_KING,
    FLAG_CASTLE_QUEEN, FLAG_EN_PASSANT, FLAG_NONE, FLAG_PROMOTION,
};
use crate::utils::{
    bishop_attacks, iter_bits, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
    NOT_FILE_A, NOT_FILE_H, RANK_1, RANK_2, RANK_7, RANK_8,
};

const PROMOTION_KINDS: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

impl Position {
    /// Every legal move for the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves: Vec<Move> = Vec::with_capacity(64);
        self.generate_pseudo_moves(&mut moves);
        let side = self.side_to_move();
        moves.retain(|&mv| {
            let mut scratch = self.clone();
            scratch.play(mv);
            !scratch.is_square_attacked(scratch.king_sq(side), !side)
        });
        moves
    }

    /// True when `color`'s king is attacked.
    pub fn in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_sq(color), !color)
    }

    pub fn is_checkmate(&self) -> bool {
        self.in_check(self.side_to_move()) && self.legal_moves().is_empty()
    }

    /// Squares `by` could capture on: the union of every `by` piece's attacks,
    /// excluding squares held by `by` itself. Does not depend on side to move.
    pub fn attacked_squares(&self, by: Color) -> SquareSet {
        let own = self.occupancy(by);
        SquareSet(self.coverage(by) & !own)
    }

    /// Squares covered by `color`, including its own occupied squares, i.e.
    /// the squares where a capture by the opponent could be answered.
    pub fn defended_squares(&self, color: Color) -> SquareSet {
        SquareSet(self.coverage(color))
    }

    /// Squares the piece on `sq` could capture on. Empty when `sq` is empty.
    pub fn attacks_from(&self, sq: Square) -> SquareSet {
        match self.piece_at(sq) {
            Some(piece) => SquareSet(
                self.raw_attacks(piece.kind, piece.color, sq.index()) & !self.occupancy(piece.color),
            ),
            None => SquareSet::EMPTY,
        }
    }

    fn coverage(&self, color: Color) -> u64 {
        let mut covered = 0u64;
        for kind in PieceKind::ALL {
            for sq in iter_bits(self.piece_bb(kind, color)) {
                covered |= self.raw_attacks(kind, color, sq);
            }
        }
        covered
    }

    // Attack set of a piece standing on sq, blockers included
    fn raw_attacks(&self, kind: PieceKind, color: Color, sq: usize) -> u64 {
        match kind {
            PieceKind::Pawn => pawn_attacks(sq, color == Color::White),
            PieceKind::Knight => knight_attacks(sq),
            PieceKind::Bishop => bishop_attacks(sq, self.occ),
            PieceKind::Rook => rook_attacks(sq, self.occ),
            PieceKind::Queen => bishop_attacks(sq, self.occ) | rook_attacks(sq, self.occ),
            PieceKind::King => king_attacks(sq),
        }
    }

    // Legality helpers -------------------------------------------
    pub(crate) fn is_square_attacked(&self, sq: usize, by: Color) -> bool {
        // A `by` pawn hits sq from the squares a pawn of the other color would hit from sq
        if pawn_attacks(sq, by == Color::Black) & self.piece_bb(PieceKind::Pawn, by) != 0 {
            return true;
        }
        if knight_attacks(sq) & self.piece_bb(PieceKind::Knight, by) != 0 {
            return true;
        }
        if king_attacks(sq) & self.piece_bb(PieceKind::King, by) != 0 {
            return true;
        }
        let queens = self.piece_bb(PieceKind::Queen, by);
        let diagonal = self.piece_bb(PieceKind::Bishop, by) | queens;
        if diagonal != 0 && bishop_attacks(sq, self.occ) & diagonal != 0 {
            return true;
        }
        let orthogonal = self.piece_bb(PieceKind::Rook, by) | queens;
        orthogonal != 0 && rook_attacks(sq, self.occ) & orthogonal != 0
    }

    // Generate moves APIs -----------------------------------------
    pub(crate) fn generate_pseudo_moves(&self, out: &mut Vec<Move>) {
        let side = self.side_to_move();
        self.generate_pawn_pseudos(side, out);
        for kind in [
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ] {
            self.generate_piece_pseudos(kind, side, out);
        }
        self.generate_castling_moves(side, out);
    }

    fn generate_piece_pseudos(&self, kind: PieceKind, side: Color, out: &mut Vec<Move>) {
        let own = self.occupancy(side);
        for from in iter_bits(self.piece_bb(kind, side)) {
            for to in iter_bits(self.raw_attacks(kind, side, from) & !own) {
                match self.piece_on(to) {
                    Some(victim) => out.push(Move::new(
                        from,
                        to,
                        kind,
                        Some(victim.kind),
                        None,
                        FLAG_CAPTURE,
                    )),
                    None => out.push(Move::new(from, to, kind, None, None, FLAG_NONE)),
                }
            }
        }
    }

    // Push a pawn move, expanding it into the four promotions on the last rank
    fn push_pawn_move(&self, from: usize, to: usize, captured: Option<PieceKind>, out: &mut Vec<Move>) {
        let flags = if captured.is_some() { FLAG_CAPTURE } else { FLAG_NONE };
        if (1u64 << to) & (RANK_1 | RANK_8) != 0 {
            for kind in PROMOTION_KINDS {
                out.push(Move::new(
                    from,
                    to,
                    PieceKind::Pawn,
                    captured,
                    Some(kind),
                    flags | FLAG_PROMOTION,
                ));
            }
        } else {
            out.push(Move::new(from, to, PieceKind::Pawn, captured, None, flags));
        }
    }

    fn generate_pawn_pseudos(&self, side: Color, out: &mut Vec<Move>) {
        let pawns = self.piece_bb(PieceKind::Pawn, side);
        let empty = !self.occ;
        let enemy_occ = self.occupancy(!side);

        // Single pushes
        let push_dest = match side {
            Color::White => (pawns << 8) & empty,
            Color::Black => (pawns >> 8) & empty,
        };
        for to in iter_bits(push_dest) {
            let from = match side {
                Color::White => to - 8,
                Color::Black => to + 8,
            };
            self.push_pawn_move(from, to, None, out);
        }

        // Double pushes (only if on start rank)
        let double_dest = match side {
            Color::White => (((pawns & RANK_2) << 8 & empty) << 8) & empty,
            Color::Black => (((pawns & RANK_7) >> 8 & empty) >> 8) & empty,
        };
        for to in iter_bits(double_dest) {
            let from = match side {
                Color::White => to - 16,
                Color::Black => to + 16,
            };
            out.push(Move::new(from, to, PieceKind::Pawn, None, None, FLAG_NONE));
        }

        // Captures toward the h-file and toward the a-file
        let (right, left) = match side {
            Color::White => (((pawns & NOT_FILE_H) << 9), ((pawns & NOT_FILE_A) << 7)),
            Color::Black => (((pawns & NOT_FILE_H) >> 7), ((pawns & NOT_FILE_A) >> 9)),
        };
        for to in iter_bits(right & enemy_occ) {
            let from = match side {
                Color::White => to - 9,
                Color::Black => to + 7,
            };
            let victim = self.piece_on(to).map(|p| p.kind);
            self.push_pawn_move(from, to, victim, out);
        }
        for to in iter_bits(left & enemy_occ) {
            let from = match side {
                Color::White => to - 7,
                Color::Black => to + 9,
            };
            let victim = self.piece_on(to).map(|p| p.kind);
            self.push_pawn_move(from, to, victim, out);
        }

        // En passant captures (handled separately because ep square is empty)
        if let Some(ep_sq) = self.en_passant() {
            let ep_sq = ep_sq.index();
            // Pawns attacking the ep square are where an opposite-colored pawn on it would attack
            let attackers = pawn_attacks(ep_sq, side == Color::Black) & pawns;
            for from in iter_bits(attackers) {
                out.push(Move::new(
                    from,
                    ep_sq,
                    PieceKind::Pawn,
                    Some(PieceKind::Pawn),
                    None,
                    FLAG_EN_PASSANT | FLAG_CAPTURE,
                ));
            }
        }
    }

    fn generate_castling_moves(&self, side: Color, out: &mut Vec<Move>) {
        let king_from = match side {
            Color::White => 4,
            Color::Black => 60,
        };
        if self.king_sq(side) != king_from {
            return;
        }
        let enemy = !side;
        let rooks = self.piece_bb(PieceKind::Rook, side);
        let base = king_from - 4;

        // (right, rook square, squares that must be empty, squares the king crosses, king target, flag)
        let kingside = (
            self.can_castle_kingside(side),
            base + 7,
            0b0110_0000u64 << base,
            [base + 4, base + 5, base + 6],
            base + 6,
            FLAG_CASTLE_KING,
        );
        let queenside = (
            self.can_castle_queenside(side),
            base,
            0b0000_1110u64 << base,
            [base + 4, base + 3, base + 2],
            base + 2,
            FLAG_CASTLE_QUEEN,
        );

        for (allowed, rook_sq, between, transit, king_to, flag) in [kingside, queenside] {
            if !allowed || rooks & (1u64 << rook_sq) == 0 || self.occ & between != 0 {
                continue;
            }
            if transit.iter().any(|&sq| self.is_square_attacked(sq, enemy)) {
                continue;
            }
            out.push(Move::new(king_from, king_to, PieceKind::King, None, None, flag));
        }
    }
}

/// Number of leaf nodes of the legal move tree `depth` plies deep.
pub fn perft(pos: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = pos.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .into_iter()
        .map(|mv| perft(&pos.apply(mv), depth - 1))
        .sum()
}

/// Perft split by root move, sorted by UCI notation.
pub fn perft_divide(pos: &Position, depth: u8) -> Vec<(Move, u64)> {
    let mut split: Vec<(Move, u64)> = pos
        .legal_moves()
        .into_iter()
        .map(|mv| (mv, perft(&pos.apply(mv), depth.saturating_sub(1))))
        .collect();
    split.sort_by_key(|(mv, _)| mv.to_uci());
    split
}
