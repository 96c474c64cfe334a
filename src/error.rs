//! Error types for position setup, move resolution and game loading.

/// Invalid FEN text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("missing FEN field: {0}")]
    MissingField(&'static str),

    #[error("invalid piece placement: {0}")]
    InvalidPlacement(String),

    #[error("invalid side to move: {0}")]
    InvalidSide(String),

    #[error("invalid castling field: {0}")]
    InvalidCastling(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassant(String),

    #[error("invalid move counter: {0}")]
    InvalidCounter(String),

    #[error("expected exactly one {color} king, found {count}")]
    KingCount { color: &'static str, count: u32 },

    #[error("side not to move is in check")]
    OpponentInCheck,
}

/// A SAN token that cannot be turned into exactly one legal move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    /// No legal move matches the token (covers malformed tokens too).
    #[error("illegal move `{token}` in position {fen}")]
    IllegalMove { token: String, fen: String },

    /// More than one legal move matches the token.
    #[error("ambiguous move `{token}`, candidates: {}", candidates.join(", "))]
    AmbiguousMove {
        token: String,
        candidates: Vec<String>,
    },
}

/// Unparsable game text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PgnError {
    #[error("no game found in input")]
    Empty,

    #[error("malformed tag pair on line {line}: {text}")]
    MalformedTag { line: usize, text: String },

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("unbalanced variation parentheses")]
    UnbalancedVariation,

    #[error("unexpected movetext token `{0}`")]
    UnexpectedToken(String),

    #[error("invalid FEN tag: {0}")]
    Fen(#[from] FenError),
}
