pub mod board;
pub mod error;
pub mod fork;
pub mod movegen;
pub mod pgn;
pub mod san;
pub mod utils;

pub use board::{Color, Move, Piece, PieceKind, Position, Square, SquareSet, START_FEN};
pub use error::{FenError, PgnError, SanError};
pub use fork::{
    check_fork_in_variant, get_board_after_moves, ForkDetector, ForkReport, ForkRules, ForkTarget,
};
pub use movegen::{perft, perft_divide};
pub use pgn::{load_from_pgn, Game, Variation};
pub use san::{resolve, San};

/// Builds the leaper attack tables. Safe to call more than once.
pub fn init() {
    utils::init_attack_tables();
}
