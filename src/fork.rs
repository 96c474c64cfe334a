//! Fork detection over a replayed variation.
//!
//! Every token is resolved and applied in order. After each ply the piece
//! that just moved is inspected from its destination square; when it attacks
//! enough valuable targets the ply is a fork candidate. Two or more non-king
//! targets make a fork on the spot. A candidate that only reaches two targets
//! by counting the checked king is, under [`ForkRules::require_win`], reported
//! once the same piece captures one of its targets on its side's next move.

use log::{debug, trace};

use crate::board::{Color, Move, Piece, PieceKind, Position, Square, SquareSet};
use crate::error::SanError;
use crate::san::resolve;

/// What counts as a fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkRules {
    /// Smallest material value of a non-king target
    pub min_target_value: u32,

    /// Count a checked king as one of the targets
    pub count_king: bool,

    /// A fork that needs the checked king to reach two targets is only
    /// reported once the forking piece captures one of its other targets
    pub require_win: bool,

    /// Skip targets that are defended and worth no more than the forking piece
    pub require_loose_targets: bool,
}

impl Default for ForkRules {
    fn default() -> Self {
        Self {
            min_target_value: 3,
            count_king: true,
            require_win: true,
            require_loose_targets: false,
        }
    }
}

impl ForkRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two or more non-king pieces worth at least a minor piece, attacked by
    /// the same move. No check, no follow-up capture needed.
    pub fn baseline() -> Self {
        Self {
            min_target_value: 3,
            count_king: false,
            require_win: false,
            require_loose_targets: false,
        }
    }

    pub fn min_target_value(mut self, value: u32) -> Self {
        self.min_target_value = value;
        self
    }

    pub fn count_king(mut self, enable: bool) -> Self {
        self.count_king = enable;
        self
    }

    pub fn require_win(mut self, enable: bool) -> Self {
        self.require_win = enable;
        self
    }

    pub fn require_loose_targets(mut self, enable: bool) -> Self {
        self.require_loose_targets = enable;
        self
    }
}

/// An enemy piece hit by the forking piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkTarget {
    pub square: Square,
    pub piece: Piece,
}

/// The forking move found in a variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkReport {
    /// Index of the forking move in the token list
    pub ply: usize,
    /// The token as supplied
    pub token: String,
    pub mv: Move,
    /// The forking piece, after promotion if any
    pub piece: Piece,
    pub square: Square,
    pub targets: Vec<ForkTarget>,
    pub gives_check: bool,
    /// Index of the capture that won a target, under `require_win`
    pub won_at: Option<usize>,
}

impl ForkReport {
    /// Side that made the forking move.
    pub fn side(&self) -> Color {
        self.piece.color
    }

    pub fn forked_squares(&self) -> SquareSet {
        self.targets.iter().map(|t| t.square).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForkDetector {
    rules: ForkRules,
}

impl ForkDetector {
    pub fn new(rules: ForkRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ForkRules {
        &self.rules
    }

    /// Targets of the piece on `sq`, in square order. Empty when `sq` is empty.
    pub fn targets(&self, pos: &Position, sq: Square) -> Vec<ForkTarget> {
        let Some(forker) = pos.piece_at(sq) else {
            return Vec::new();
        };
        let defended = if self.rules.require_loose_targets {
            pos.defended_squares(!forker.color)
        } else {
            SquareSet::EMPTY
        };

        pos.attacks_from(sq)
            .iter()
            .filter_map(|square| {
                let piece = pos.piece_at(square)?;
                let counts = match piece.kind.value() {
                    None => self.rules.count_king,
                    Some(value) => {
                        value >= self.rules.min_target_value
                            && (!defended.contains(square)
                                || forker.kind.value().map_or(false, |own| value > own))
                    }
                };
                counts.then_some(ForkTarget { square, piece })
            })
            .collect()
    }

    /// The fork predicate for the piece on `sq`: at least two targets, at
    /// least one of them not the king.
    pub fn fork_at(&self, pos: &Position, sq: Square) -> Option<Vec<ForkTarget>> {
        let targets = self.targets(pos, sq);
        let material = targets
            .iter()
            .filter(|t| t.piece.kind != PieceKind::King)
            .count();
        (targets.len() >= 2 && material >= 1).then_some(targets)
    }

    /// Replays `tokens` from `start` and returns the first fork, if any.
    pub fn scan<S: AsRef<str>>(
        &self,
        start: &Position,
        tokens: &[S],
    ) -> Result<Option<ForkReport>, SanError> {
        let mut pos = start.clone();
        // Unconfirmed candidate per color, waiting for its winning capture
        let mut pending: [Option<ForkReport>; 2] = [None, None];

        for (ply, token) in tokens.iter().enumerate() {
            let token = token.as_ref();
            let mv = resolve(&pos, token)?;
            let mover = pos.side_to_move();
            let next = pos.apply(mv);
            trace!("ply {}: {} ({})", ply, token, mv);

            if let Some(candidate) = pending[mover as usize].take() {
                if wins_target(&candidate, mv) {
                    debug!(
                        "fork {} confirmed by {} at ply {}",
                        candidate.token, token, ply
                    );
                    return Ok(Some(ForkReport {
                        won_at: Some(ply),
                        ..candidate
                    }));
                }
            }

            if let Some(targets) = self.fork_at(&next, mv.to()) {
                let report = ForkReport {
                    ply,
                    token: token.to_string(),
                    mv,
                    piece: Piece::new(mv.promotion().unwrap_or(mv.piece()), mover),
                    square: mv.to(),
                    gives_check: next.in_check(!mover),
                    targets,
                    won_at: None,
                };
                debug!(
                    "fork candidate {} at ply {} hitting {:?}",
                    token,
                    ply,
                    report.targets.iter().map(|t| t.square.to_string()).collect::<Vec<_>>()
                );
                let material = report
                    .targets
                    .iter()
                    .filter(|t| t.piece.kind != PieceKind::King)
                    .count();
                if !self.rules.require_win || material >= 2 {
                    return Ok(Some(report));
                }
                pending[mover as usize] = Some(report);
            }

            pos = next;
        }

        Ok(None)
    }
}

// The forking piece moves again and takes one of its non-king targets
fn wins_target(candidate: &ForkReport, mv: Move) -> bool {
    mv.from() == candidate.square
        && candidate
            .targets
            .iter()
            .any(|t| t.square == mv.to() && t.piece.kind != PieceKind::King)
}

/// The position reached from `start` after playing every token.
pub fn get_board_after_moves<P, S>(start: &P, tokens: &[S]) -> Result<Position, SanError>
where
    P: AsRef<Position> + ?Sized,
    S: AsRef<str>,
{
    tokens
        .iter()
        .try_fold(start.as_ref().clone(), |pos, token| {
            let mv = resolve(&pos, token.as_ref())?;
            trace!("{} -> {}", token.as_ref(), mv);
            Ok(pos.apply(mv))
        })
}

/// Replays `tokens` from `pos` with the default [`ForkRules`] and reports
/// whether the variation contains a fork.
pub fn check_fork_in_variant<S: AsRef<str>>(
    pos: &Position,
    tokens: &[S],
) -> Result<(bool, Option<ForkReport>), SanError> {
    let report = ForkDetector::default().scan(pos, tokens)?;
    Ok((report.is_some(), report))
}
