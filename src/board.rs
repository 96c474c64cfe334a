// Mapping di quadrati: A1=0, B1=1, ..., H8=63
// Usiamo questo mapping coerente per tutte le operazioni

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

use crate::error::FenError;
use crate::utils::iter_bits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl Not for Color {
    type Output = Color;

    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    /// Material value in pawns. The king has no finite value.
    pub fn value(self) -> Option<u32> {
        match self {
            PieceKind::Pawn => Some(1),
            PieceKind::Knight | PieceKind::Bishop => Some(3),
            PieceKind::Rook => Some(5),
            PieceKind::Queen => Some(9),
            PieceKind::King => None,
        }
    }

    /// Upper-case letter used by SAN and white pieces in FEN.
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub fn from_letter(ch: char) -> Option<PieceKind> {
        match ch.to_ascii_uppercase() {
            'P' => Some(PieceKind::Pawn),
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            _ => None,
        }
    }

    fn from_bits(v: u32) -> Option<PieceKind> {
        PieceKind::ALL.get(v as usize).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// FEN character: upper case for white, lower case for black.
    pub fn fen_char(self) -> char {
        match self.color {
            Color::White => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn from_fen_char(ch: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(ch)?;
        let color = if ch.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(kind, color))
    }
}

// Indice nel piece_bb array: white piece = kind as usize; black piece = 6 + kind as usize
fn piece_index(kind: PieceKind, color: Color) -> usize {
    (color as usize) * 6 + (kind as usize)
}

/// A board square, file and rank both in `0..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub fn new(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8);
        Square(rank * 8 + file)
    }

    pub fn from_index(idx: usize) -> Self {
        debug_assert!(idx < 64);
        Square(idx as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    pub fn file_char(self) -> char {
        (b'a' + self.file()) as char
    }

    pub fn rank_char(self) -> char {
        (b'1' + self.rank()) as char
    }

    pub(crate) fn bb(self) -> u64 {
        1u64 << self.0
    }
}

impl FromStr for Square {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.as_bytes() {
            [file @ b'a'..=b'h', rank @ b'1'..=b'8'] => Ok(Square::new(file - b'a', rank - b'1')),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

/// Set of squares backed by a bitboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SquareSet(pub u64);

impl SquareSet {
    pub const EMPTY: SquareSet = SquareSet(0);

    pub fn contains(self, sq: Square) -> bool {
        self.0 & sq.bb() != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Squares in ascending index order (a1, b1, ..., h8).
    pub fn iter(self) -> impl Iterator<Item = Square> {
        iter_bits(self.0).map(Square::from_index)
    }
}

impl BitAnd for SquareSet {
    type Output = SquareSet;

    fn bitand(self, rhs: SquareSet) -> SquareSet {
        SquareSet(self.0 & rhs.0)
    }
}

impl BitOr for SquareSet {
    type Output = SquareSet;

    fn bitor(self, rhs: SquareSet) -> SquareSet {
        SquareSet(self.0 | rhs.0)
    }
}

impl FromIterator<Square> for SquareSet {
    fn from_iter<I: IntoIterator<Item = Square>>(iter: I) -> Self {
        SquareSet(iter.into_iter().fold(0, |bb, sq| bb | sq.bb()))
    }
}

// Codifica mosse: 32-bit layout
// Bits 0-5: from (0-63)
// Bits 6-11: to (0-63)
// Bits 12-15: piece (0-5)
// Bits 16-19: captured (0-5, 0xF = none)
// Bits 20-23: promotion (0-5, 0xF = none)
// Bits 24-31: flags
pub const FLAG_NONE: u32 = 0;
pub const FLAG_EN_PASSANT: u32 = 1 << 24;
pub const FLAG_CASTLE_KING: u32 = 1 << 25;
pub const FLAG_CASTLE_QUEEN: u32 = 1 << 26;
pub const FLAG_PROMOTION: u32 = 1 << 27;
pub const FLAG_CAPTURE: u32 = 1 << 28;

/// A fully described move: squares, moving piece, capture, promotion, flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

impl Move {
    pub(crate) fn new(
        from: usize,
        to: usize,
        piece: PieceKind,
        captured: Option<PieceKind>,
        promotion: Option<PieceKind>,
        flags: u32,
    ) -> Self {
        let cap = captured.map(|p| p as u32).unwrap_or(0xF);
        let prom = promotion.map(|p| p as u32).unwrap_or(0xF);
        Move(
            (from as u32 & 0x3F)
                | ((to as u32 & 0x3F) << 6)
                | ((piece as u32 & 0xF) << 12)
                | ((cap & 0xF) << 16)
                | ((prom & 0xF) << 20)
                | flags,
        )
    }

    pub(crate) fn from_index(self) -> usize {
        (self.0 & 0x3F) as usize
    }

    pub(crate) fn to_index(self) -> usize {
        ((self.0 >> 6) & 0x3F) as usize
    }

    pub fn from(self) -> Square {
        Square::from_index(self.from_index())
    }

    pub fn to(self) -> Square {
        Square::from_index(self.to_index())
    }

    pub fn piece(self) -> PieceKind {
        // The piece nibble is always written from a PieceKind.
        PieceKind::from_bits((self.0 >> 12) & 0xF).unwrap_or(PieceKind::Pawn)
    }

    pub fn captured(self) -> Option<PieceKind> {
        PieceKind::from_bits((self.0 >> 16) & 0xF)
    }

    pub fn promotion(self) -> Option<PieceKind> {
        PieceKind::from_bits((self.0 >> 20) & 0xF)
    }

    fn flag(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_capture(self) -> bool {
        self.flag(FLAG_CAPTURE)
    }

    pub fn is_en_passant(self) -> bool {
        self.flag(FLAG_EN_PASSANT)
    }

    pub fn is_castle_kingside(self) -> bool {
        self.flag(FLAG_CASTLE_KING)
    }

    pub fn is_castle_queenside(self) -> bool {
        self.flag(FLAG_CASTLE_QUEEN)
    }

    pub fn is_castle(self) -> bool {
        self.flag(FLAG_CASTLE_KING | FLAG_CASTLE_QUEEN)
    }

    /// UCI notation, e.g. `e2e4` or `e7e8q`.
    pub fn to_uci(self) -> String {
        let mut uci = format!("{}{}", self.from(), self.to());
        if let Some(promo) = self.promotion() {
            uci.push(promo.letter().to_ascii_lowercase());
        }
        uci
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

// Castling bits: bit 3=K, bit 2=Q, bit 1=k, bit 0=q
pub const CASTLE_WHITE_KING: u8 = 0b1000;
pub const CASTLE_WHITE_QUEEN: u8 = 0b0100;
pub const CASTLE_BLACK_KING: u8 = 0b0010;
pub const CASTLE_BLACK_QUEEN: u8 = 0b0001;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Board state for one ply. Positions are values: moves produce new
/// positions through [`Position::apply`] and never change the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    // 12 bitboard: 0-5 = white p,n,b,r,q,k; 6-11 = black p,n,b,r,q,k
    piece_bb: [u64; 12],
    pub(crate) white_occ: u64,
    pub(crate) black_occ: u64,
    pub(crate) occ: u64,
    side: Color,
    castling: u8,
    ep: Option<u8>,
    halfmove: u16,
    fullmove: u16,
    white_king_sq: u8,
    black_king_sq: u8,
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position {
    // Board vuota da popolare via FEN
    fn empty() -> Self {
        Self {
            piece_bb: [0; 12],
            white_occ: 0,
            black_occ: 0,
            occ: 0,
            side: Color::White,
            castling: 0,
            ep: None,
            halfmove: 0,
            fullmove: 1,
            white_king_sq: 0,
            black_king_sq: 0,
        }
    }

    /// The standard initial setup.
    pub fn startpos() -> Self {
        // START_FEN is a constant known to parse.
        Self::from_fen(START_FEN).unwrap_or_else(|_| unreachable!("START_FEN is valid"))
    }

    pub fn side_to_move(&self) -> Color {
        self.side
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.ep.map(|sq| Square::from_index(sq as usize))
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove
    }

    pub fn fullmove_number(&self) -> u16 {
        self.fullmove
    }

    pub fn castling_rights(&self) -> u8 {
        self.castling
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        let mask = match color {
            Color::White => CASTLE_WHITE_KING,
            Color::Black => CASTLE_BLACK_KING,
        };
        self.castling & mask != 0
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        let mask = match color {
            Color::White => CASTLE_WHITE_QUEEN,
            Color::Black => CASTLE_BLACK_QUEEN,
        };
        self.castling & mask != 0
    }

    pub(crate) fn piece_bb(&self, kind: PieceKind, color: Color) -> u64 {
        self.piece_bb[piece_index(kind, color)]
    }

    pub(crate) fn occupancy(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_occ,
            Color::Black => self.black_occ,
        }
    }

    pub fn pieces(&self, kind: PieceKind, color: Color) -> SquareSet {
        SquareSet(self.piece_bb(kind, color))
    }

    pub fn occupied_by(&self, color: Color) -> SquareSet {
        SquareSet(self.occupancy(color))
    }

    pub fn occupied(&self) -> SquareSet {
        SquareSet(self.occ)
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.piece_on(sq.index())
    }

    // Restituisce piece (kind,color) su square idx o None
    pub(crate) fn piece_on(&self, sq: usize) -> Option<Piece> {
        let mask = 1u64 << sq;
        if self.occ & mask == 0 {
            return None;
        }
        (0..12).find(|&i| self.piece_bb[i] & mask != 0).map(|i| {
            let color = if i < 6 { Color::White } else { Color::Black };
            Piece::new(PieceKind::ALL[i % 6], color)
        })
    }

    pub(crate) fn king_sq(&self, side: Color) -> usize {
        match side {
            Color::White => self.white_king_sq as usize,
            Color::Black => self.black_king_sq as usize,
        }
    }

    pub fn king_square(&self, color: Color) -> Square {
        Square::from_index(self.king_sq(color))
    }

    // Posiziona un pezzo; NON aggiorna occupancy (refresh_occupancy)
    fn set_piece(&mut self, sq: usize, kind: PieceKind, color: Color) {
        self.piece_bb[piece_index(kind, color)] |= 1u64 << sq;
        if kind == PieceKind::King {
            match color {
                Color::White => self.white_king_sq = sq as u8,
                Color::Black => self.black_king_sq = sq as u8,
            }
        }
    }

    fn remove_piece(&mut self, sq: usize, kind: PieceKind, color: Color) {
        self.piece_bb[piece_index(kind, color)] &= !(1u64 << sq);
    }

    fn refresh_occupancy(&mut self) {
        self.white_occ = self.piece_bb[..6].iter().fold(0, |acc, bb| acc | bb);
        self.black_occ = self.piece_bb[6..].iter().fold(0, |acc, bb| acc | bb);
        self.occ = self.white_occ | self.black_occ;
    }

    /// The successor position after `mv`. The receiver is left untouched.
    ///
    /// `mv` must come from [`Position::legal_moves`] (or the SAN resolver) for
    /// this very position; anything else is a caller bug.
    pub fn apply(&self, mv: Move) -> Position {
        let mut next = self.clone();
        next.play(mv);
        next
    }

    // Aggiorna la posizione in place. Usata da apply e dal filtro di legalità.
    pub(crate) fn play(&mut self, mv: Move) {
        let from = mv.from_index();
        let to = mv.to_index();
        let piece = mv.piece();
        let color = self.side;
        let them = !color;

        debug_assert_eq!(
            self.piece_on(from),
            Some(Piece::new(piece, color)),
            "move {} does not match the board",
            mv
        );

        let captured_sq = if mv.is_en_passant() {
            match color {
                Color::White => to - 8,
                Color::Black => to + 8,
            }
        } else {
            to
        };

        self.update_castling_after_move(color, piece, from);
        if let Some(capt) = mv.captured() {
            self.remove_piece(captured_sq, capt, them);
            // Catturare una torre sulla casella iniziale toglie il diritto relativo
            if capt == PieceKind::Rook {
                self.update_castling_on_rook_capture(captured_sq);
            }
        }

        self.remove_piece(from, piece, color);
        self.set_piece(to, mv.promotion().unwrap_or(piece), color);

        // Handle castling: move the rook as well
        let rook_hop = if mv.is_castle_kingside() {
            Some(match color {
                Color::White => (7, 5),   // h1 -> f1
                Color::Black => (63, 61), // h8 -> f8
            })
        } else if mv.is_castle_queenside() {
            Some(match color {
                Color::White => (0, 3),   // a1 -> d1
                Color::Black => (56, 59), // a8 -> d8
            })
        } else {
            None
        };
        if let Some((rook_from, rook_to)) = rook_hop {
            self.remove_piece(rook_from, PieceKind::Rook, color);
            self.set_piece(rook_to, PieceKind::Rook, color);
        }

        self.refresh_occupancy();

        self.ep = if piece == PieceKind::Pawn && to.abs_diff(from) == 16 {
            Some(((from + to) / 2) as u8)
        } else {
            None
        };

        self.halfmove = if piece == PieceKind::Pawn || mv.is_capture() {
            0
        } else {
            self.halfmove.saturating_add(1)
        };
        self.side = them;
        if self.side == Color::White {
            self.fullmove = self.fullmove.saturating_add(1);
        }
    }

    // Il re o una torre lasciano la casella iniziale: si perdono i diritti relativi
    fn update_castling_after_move(&mut self, side: Color, piece: PieceKind, from: usize) {
        const KING_SQ: [usize; 2] = [4, 60]; // e1, e8
        const ROOK_KS: [usize; 2] = [7, 63]; // h1, h8
        const ROOK_QS: [usize; 2] = [0, 56]; // a1, a8

        let (king_side, queen_side) = match side {
            Color::White => (CASTLE_WHITE_KING, CASTLE_WHITE_QUEEN),
            Color::Black => (CASTLE_BLACK_KING, CASTLE_BLACK_QUEEN),
        };
        if piece == PieceKind::King && from == KING_SQ[side as usize] {
            self.castling &= !(king_side | queen_side);
        }
        if piece == PieceKind::Rook {
            if from == ROOK_KS[side as usize] {
                self.castling &= !king_side;
            } else if from == ROOK_QS[side as usize] {
                self.castling &= !queen_side;
            }
        }
    }

    fn update_castling_on_rook_capture(&mut self, captured_square: usize) {
        self.castling &= match captured_square {
            7 => !CASTLE_WHITE_KING,
            0 => !CASTLE_WHITE_QUEEN,
            63 => !CASTLE_BLACK_KING,
            56 => !CASTLE_BLACK_QUEEN,
            _ => !0,
        };
    }
}

// FEN parsing/printing
impl Position {
    /// Parses FEN. The halfmove and fullmove fields may be omitted.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut parts = fen.split_whitespace();
        let piece_part = parts.next().ok_or(FenError::MissingField("pieces"))?;
        let side_part = parts.next().ok_or(FenError::MissingField("side"))?;
        let castle_part = parts.next().ok_or(FenError::MissingField("castling"))?;
        let ep_part = parts.next().ok_or(FenError::MissingField("en passant"))?;
        let halfmove_part = parts.next().unwrap_or("0");
        let fullmove_part = parts.next().unwrap_or("1");

        let mut pos = Position::empty();

        // Parse pieces: rank8 .. rank1
        let ranks: Vec<&str> = piece_part.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::InvalidPlacement(piece_part.to_string()));
        }
        for (i, rank_part) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for ch in rank_part.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_fen_char(ch)
                        .ok_or_else(|| FenError::InvalidPlacement(piece_part.to_string()))?;
                    if file >= 8 {
                        return Err(FenError::InvalidPlacement(piece_part.to_string()));
                    }
                    pos.set_piece(rank * 8 + file, piece.kind, piece.color);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::InvalidPlacement(piece_part.to_string()));
            }
        }

        for color in [Color::White, Color::Black] {
            let count = pos.piece_bb(PieceKind::King, color).count_ones();
            if count != 1 {
                return Err(FenError::KingCount {
                    color: color.name(),
                    count,
                });
            }
        }

        pos.refresh_occupancy();

        pos.side = match side_part {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(FenError::InvalidSide(side_part.to_string())),
        };

        for ch in castle_part.chars() {
            match ch {
                'K' => pos.castling |= CASTLE_WHITE_KING,
                'Q' => pos.castling |= CASTLE_WHITE_QUEEN,
                'k' => pos.castling |= CASTLE_BLACK_KING,
                'q' => pos.castling |= CASTLE_BLACK_QUEEN,
                '-' => {}
                _ => return Err(FenError::InvalidCastling(castle_part.to_string())),
            }
        }

        pos.ep = match ep_part {
            "-" => None,
            s => {
                let sq: Square = s
                    .parse()
                    .map_err(|_| FenError::InvalidEnPassant(s.to_string()))?;
                if !pos.en_passant_plausible(sq) {
                    return Err(FenError::InvalidEnPassant(s.to_string()));
                }
                Some(sq.index() as u8)
            }
        };

        pos.halfmove = halfmove_part
            .parse()
            .map_err(|_| FenError::InvalidCounter(halfmove_part.to_string()))?;
        pos.fullmove = fullmove_part
            .parse()
            .map_err(|_| FenError::InvalidCounter(fullmove_part.to_string()))?;

        if pos.in_check(!pos.side) {
            return Err(FenError::OpponentInCheck);
        }

        Ok(pos)
    }

    // The target must be empty and sit right behind a pawn that just made a
    // double push from a now empty start square.
    fn en_passant_plausible(&self, ep: Square) -> bool {
        let idx = ep.index();
        let (rank, pushed, origin) = match self.side {
            Color::White => (5, idx.wrapping_sub(8), idx + 8),
            Color::Black => (2, idx + 8, idx.wrapping_sub(8)),
        };
        ep.rank() == rank
            && self.piece_on(idx).is_none()
            && self.piece_on(origin).is_none()
            && self.piece_on(pushed) == Some(Piece::new(PieceKind::Pawn, !self.side))
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.piece_on(rank * 8 + file) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling == 0 {
            fen.push('-');
        } else {
            for (mask, ch) in [
                (CASTLE_WHITE_KING, 'K'),
                (CASTLE_WHITE_QUEEN, 'Q'),
                (CASTLE_BLACK_KING, 'k'),
                (CASTLE_BLACK_QUEEN, 'q'),
            ] {
                if self.castling & mask != 0 {
                    fen.push(ch);
                }
            }
        }

        fen.push(' ');
        match self.en_passant() {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove, self.fullmove));
        fen
    }
}

// Simple display
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                match self.piece_on(rank * 8 + file) {
                    Some(piece) => write!(f, "{} ", piece.fen_char())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl AsRef<Position> for Position {
    fn as_ref(&self) -> &Position {
        self
    }
}
