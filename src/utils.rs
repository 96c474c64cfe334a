// Bitboard masks, iterators and attack tables shared by board and movegen

// File masks (A is column 0, H column 7)
pub const FILE_A: u64 = 0x0101010101010101;
pub const FILE_H: u64 = 0x8080808080808080;

pub const NOT_FILE_A: u64 = !FILE_A;
pub const NOT_FILE_H: u64 = !FILE_H;

// Rank masks (A1 is square 0)
pub const RANK_1: u64 = 0x00000000000000FF;
pub const RANK_2: u64 = 0x000000000000FF00;
pub const RANK_7: u64 = 0x00FF000000000000;
pub const RANK_8: u64 = 0xFF00000000000000;

// Ray directions as (file delta, rank delta)
pub const ORTHOGONAL: [(i8, i8); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

// Bit operations
#[inline]
pub fn pop_lsb(bb: &mut u64) -> Option<usize> {
    if *bb == 0 {
        return None;
    }
    let lsb = bb.trailing_zeros() as usize;
    *bb &= *bb - 1;
    Some(lsb)
}

pub struct BitIter {
    bb: u64,
}
impl Iterator for BitIter {
    type Item = usize;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        pop_lsb(&mut self.bb)
    }
}
#[inline]
pub fn iter_bits(bb: u64) -> BitIter {
    BitIter { bb }
}

// Leaper attack tables, built on first use
use std::sync::OnceLock;

static KNIGHT_ATTACKS: OnceLock<[u64; 64]> = OnceLock::new();
static KING_ATTACKS: OnceLock<[u64; 64]> = OnceLock::new();

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

fn leaper_table(offsets: &[(i8, i8); 8]) -> [u64; 64] {
    let mut attacks = [0u64; 64];

    for (sq, mask) in attacks.iter_mut().enumerate() {
        let file = (sq % 8) as i8;
        let rank = (sq / 8) as i8;

        for (dx, dy) in offsets {
            let new_file = file + dx;
            let new_rank = rank + dy;
            if (0..8).contains(&new_file) && (0..8).contains(&new_rank) {
                *mask |= 1u64 << (new_rank as usize * 8 + new_file as usize);
            }
        }
    }
    attacks
}

#[inline(always)]
pub fn init_attack_tables() {
    KNIGHT_ATTACKS.get_or_init(|| leaper_table(&KNIGHT_OFFSETS));
    KING_ATTACKS.get_or_init(|| leaper_table(&KING_OFFSETS));
}

#[inline]
pub fn knight_attacks(sq: usize) -> u64 {
    KNIGHT_ATTACKS.get_or_init(|| leaper_table(&KNIGHT_OFFSETS))[sq]
}

#[inline]
pub fn king_attacks(sq: usize) -> u64 {
    KING_ATTACKS.get_or_init(|| leaper_table(&KING_OFFSETS))[sq]
}

/// Squares reached from `sq` along `dirs`, each ray stopping at (and
/// including) the first occupied square.
pub fn slider_attacks(sq: usize, occ: u64, dirs: &[(i8, i8); 4]) -> u64 {
    let mut attacks = 0u64;
    for &(df, dr) in dirs {
        let mut file = (sq % 8) as i8 + df;
        let mut rank = (sq / 8) as i8 + dr;
        while (0..8).contains(&file) && (0..8).contains(&rank) {
            let bit = 1u64 << (rank as usize * 8 + file as usize);
            attacks |= bit;
            if occ & bit != 0 {
                break;
            }
            file += df;
            rank += dr;
        }
    }
    attacks
}

#[inline]
pub fn bishop_attacks(sq: usize, occ: u64) -> u64 {
    slider_attacks(sq, occ, &DIAGONAL)
}

#[inline]
pub fn rook_attacks(sq: usize, occ: u64) -> u64 {
    slider_attacks(sq, occ, &ORTHOGONAL)
}

/// Diagonal capture squares of a pawn of the given color (white = true) on `sq`.
#[inline]
pub fn pawn_attacks(sq: usize, white: bool) -> u64 {
    let bb = 1u64 << sq;
    if white {
        ((bb & NOT_FILE_A) << 7) | ((bb & NOT_FILE_H) << 9)
    } else {
        ((bb & NOT_FILE_A) >> 9) | ((bb & NOT_FILE_H) >> 7)
    }
}
