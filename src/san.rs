//! Standard algebraic notation.
//!
//! A token is first parsed into an explicit [`San`] value (piece, destination,
//! disambiguation hints, capture marker, promotion) and then matched against
//! the legal moves of a position. Resolution must end with exactly one move:
//! no match is an illegal move, several matches an ambiguous one.

use log::debug;

use crate::board::{Move, PieceKind, Position, Square};
use crate::error::SanError;

/// Check marker written after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    None,
    Check,
    Mate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanKind {
    CastleKingside,
    CastleQueenside,
    Normal {
        piece: PieceKind,
        from_file: Option<u8>,
        from_rank: Option<u8>,
        capture: bool,
        to: Square,
        promotion: Option<PieceKind>,
    },
}

/// A parsed SAN token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct San {
    pub kind: SanKind,
    pub suffix: Suffix,
}

impl San {
    /// Parses a token such as `Nxc7+`, `O-O`, `exd6` or `e8=Q`.
    ///
    /// Annotation glyphs (`!`, `?`) are dropped. Returns `None` for text that
    /// is not shaped like a move.
    pub fn parse(token: &str) -> Option<San> {
        let mut body = token.trim().trim_end_matches(['!', '?']);
        if !body.is_ascii() {
            return None;
        }

        let suffix = if let Some(rest) = body.strip_suffix('#') {
            body = rest;
            Suffix::Mate
        } else if let Some(rest) = body.strip_suffix('+') {
            body = rest;
            Suffix::Check
        } else {
            Suffix::None
        };

        let kind = match body {
            "O-O" | "0-0" => SanKind::CastleKingside,
            "O-O-O" | "0-0-0" => SanKind::CastleQueenside,
            _ => Self::parse_normal(body)?,
        };
        Some(San { kind, suffix })
    }

    fn parse_normal(body: &str) -> Option<SanKind> {
        // Promotion suffix: `=Q`, or a bare piece letter right after the rank
        let (rest, promotion) = match body.split_once('=') {
            Some((head, promo)) => (head, Some(promotion_piece(promo)?)),
            None => match body.as_bytes() {
                [.., rank, letter] if rank.is_ascii_digit() && letter.is_ascii_uppercase() => {
                    (&body[..body.len() - 1], Some(promotion_piece(&body[body.len() - 1..])?))
                }
                _ => (body, None),
            },
        };

        if rest.len() < 2 {
            return None;
        }
        let (head, dest) = rest.split_at(rest.len() - 2);
        let to: Square = dest.parse().ok()?;

        let (piece, head) = match head.chars().next() {
            Some(c @ ('N' | 'B' | 'R' | 'Q' | 'K')) => (PieceKind::from_letter(c)?, &head[1..]),
            _ => (PieceKind::Pawn, head),
        };

        let (capture, head) = match head.strip_suffix('x') {
            Some(rest) => (true, rest),
            None => (false, head),
        };

        let mut from_file = None;
        let mut from_rank = None;
        for c in head.chars() {
            match c {
                'a'..='h' if from_file.is_none() && from_rank.is_none() => {
                    from_file = Some(c as u8 - b'a');
                }
                '1'..='8' if from_rank.is_none() => from_rank = Some(c as u8 - b'1'),
                _ => return None,
            }
        }

        if piece == PieceKind::Pawn {
            // Pawn captures name the source file; a rank hint is never valid
            if (capture && from_file.is_none()) || from_rank.is_some() {
                return None;
            }
        } else if promotion.is_some() {
            return None;
        }

        Some(SanKind::Normal {
            piece,
            from_file,
            from_rank,
            capture,
            to,
            promotion,
        })
    }

    /// Whether `mv` is one of the moves this token describes.
    pub fn matches(&self, mv: Move) -> bool {
        match self.kind {
            SanKind::CastleKingside => mv.is_castle_kingside(),
            SanKind::CastleQueenside => mv.is_castle_queenside(),
            SanKind::Normal {
                piece,
                from_file,
                from_rank,
                capture,
                to,
                promotion,
            } => {
                !mv.is_castle()
                    && mv.piece() == piece
                    && mv.to() == to
                    && mv.promotion() == promotion
                    && (!capture || mv.is_capture())
                    && from_file.map_or(true, |f| mv.from().file() == f)
                    && from_rank.map_or(true, |r| mv.from().rank() == r)
            }
        }
    }
}

fn promotion_piece(text: &str) -> Option<PieceKind> {
    match text {
        "N" => Some(PieceKind::Knight),
        "B" => Some(PieceKind::Bishop),
        "R" => Some(PieceKind::Rook),
        "Q" => Some(PieceKind::Queen),
        _ => None,
    }
}

/// Maps `token` to the single legal move it denotes in `pos`.
pub fn resolve(pos: &Position, token: &str) -> Result<Move, SanError> {
    let illegal = || SanError::IllegalMove {
        token: token.to_string(),
        fen: pos.to_fen(),
    };

    let san = San::parse(token).ok_or_else(illegal)?;
    let candidates: Vec<Move> = pos
        .legal_moves()
        .into_iter()
        .filter(|&mv| san.matches(mv))
        .collect();

    match candidates.as_slice() {
        [] => Err(illegal()),
        [mv] => {
            if san.suffix != Suffix::None && suffix_of(&pos.apply(*mv)) != san.suffix {
                debug!("check marker on `{}` does not match the position", token);
            }
            Ok(*mv)
        }
        _ => Err(SanError::AmbiguousMove {
            token: token.to_string(),
            candidates: candidates.iter().map(|mv| mv.to_uci()).collect(),
        }),
    }
}

// Suffix the side to move in `after` is owed
fn suffix_of(after: &Position) -> Suffix {
    if !after.in_check(after.side_to_move()) {
        Suffix::None
    } else if after.legal_moves().is_empty() {
        Suffix::Mate
    } else {
        Suffix::Check
    }
}

impl Position {
    /// SAN for a legal move, with minimal disambiguation and check markers.
    pub fn san(&self, mv: Move) -> String {
        let mut out = String::with_capacity(8);
        if mv.is_castle_kingside() {
            out.push_str("O-O");
        } else if mv.is_castle_queenside() {
            out.push_str("O-O-O");
        } else if mv.piece() == PieceKind::Pawn {
            if mv.is_capture() {
                out.push(mv.from().file_char());
                out.push('x');
            }
            out.push_str(&mv.to().to_string());
            if let Some(promo) = mv.promotion() {
                out.push('=');
                out.push(promo.letter());
            }
        } else {
            out.push(mv.piece().letter());
            let from = mv.from();
            let rivals: Vec<Square> = self
                .legal_moves()
                .into_iter()
                .filter(|m| m.piece() == mv.piece() && m.to() == mv.to() && m.from() != from)
                .map(|m| m.from())
                .collect();
            if !rivals.is_empty() {
                if rivals.iter().all(|r| r.file() != from.file()) {
                    out.push(from.file_char());
                } else if rivals.iter().all(|r| r.rank() != from.rank()) {
                    out.push(from.rank_char());
                } else {
                    out.push(from.file_char());
                    out.push(from.rank_char());
                }
            }
            if mv.is_capture() {
                out.push('x');
            }
            out.push_str(&mv.to().to_string());
        }

        match suffix_of(&self.apply(mv)) {
            Suffix::None => {}
            Suffix::Check => out.push('+'),
            Suffix::Mate => out.push('#'),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn parses_piece_capture_with_check() {
        let san = San::parse("Nxc7+").unwrap();
        assert_eq!(san.suffix, Suffix::Check);
        assert_eq!(
            san.kind,
            SanKind::Normal {
                piece: PieceKind::Knight,
                from_file: None,
                from_rank: None,
                capture: true,
                to: "c7".parse().unwrap(),
                promotion: None,
            }
        );
    }

    #[test]
    fn parses_castling_and_promotion_forms() {
        assert_eq!(San::parse("O-O").unwrap().kind, SanKind::CastleKingside);
        assert_eq!(San::parse("0-0-0#").unwrap().kind, SanKind::CastleQueenside);
        for text in ["e8=Q", "e8Q", "e8=Q!?"] {
            match San::parse(text).unwrap().kind {
                SanKind::Normal { promotion, .. } => assert_eq!(promotion, Some(PieceKind::Queen)),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn rejects_malformed_tokens() {
        for text in ["", "x", "Nz9", "e8=K", "Ne8=Q", "e2e4e", "Pe4?", "ex4", "e3xd4"] {
            assert!(San::parse(text).is_none(), "accepted {:?}", text);
        }
        // A pawn capture must name its file
        assert!(San::parse("xd5").is_none());
    }

    #[test]
    fn resolves_opening_moves() {
        let start = Position::startpos();
        let e4 = resolve(&start, "e4").unwrap();
        assert_eq!(e4.to_uci(), "e2e4");
        let nf3 = resolve(&start, "Nf3").unwrap();
        assert_eq!(nf3.to_uci(), "g1f3");
    }

    #[test]
    fn unreachable_destination_is_illegal() {
        let start = Position::startpos();
        assert!(matches!(
            resolve(&start, "Nd5"),
            Err(SanError::IllegalMove { .. })
        ));
        assert!(matches!(
            resolve(&start, "e5"),
            Err(SanError::IllegalMove { .. })
        ));
        assert!(matches!(
            resolve(&start, "hello"),
            Err(SanError::IllegalMove { .. })
        ));
    }

    #[test]
    fn file_disambiguation() {
        let p = pos("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        match resolve(&p, "Nd2") {
            Err(SanError::AmbiguousMove { candidates, .. }) => {
                let mut c = candidates;
                c.sort();
                assert_eq!(c, vec!["b1d2".to_string(), "f1d2".to_string()]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
        assert_eq!(resolve(&p, "Nbd2").unwrap().to_uci(), "b1d2");
        assert_eq!(resolve(&p, "Nfd2").unwrap().to_uci(), "f1d2");
    }

    #[test]
    fn rank_disambiguation() {
        let p = pos("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1");
        assert!(matches!(
            resolve(&p, "Ra3"),
            Err(SanError::AmbiguousMove { .. })
        ));
        assert_eq!(resolve(&p, "R1a3").unwrap().to_uci(), "a1a3");
        assert_eq!(resolve(&p, "R5a3").unwrap().to_uci(), "a5a3");
        assert_eq!(p.san(resolve(&p, "R5a3").unwrap()), "R5a3");
    }

    #[test]
    fn full_square_disambiguation() {
        let p = pos("4k3/8/8/8/8/Q7/8/Q1Q1K3 w - - 0 1");
        let mv = resolve(&p, "Qa1b2").unwrap();
        assert_eq!(mv.to_uci(), "a1b2");
        assert_eq!(p.san(mv), "Qa1b2");
    }

    #[test]
    fn promotion_needs_piece() {
        let p = pos("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1");
        assert!(matches!(
            resolve(&p, "b8"),
            Err(SanError::IllegalMove { .. })
        ));
        let mv = resolve(&p, "b8=N").unwrap();
        assert_eq!(mv.promotion(), Some(PieceKind::Knight));
        assert_eq!(p.san(mv), "b8=N");
        assert_eq!(p.san(resolve(&p, "b8Q").unwrap()), "b8=Q+");
    }

    #[test]
    fn en_passant_token() {
        let p = pos("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2");
        let mv = resolve(&p, "exd6").unwrap();
        assert!(mv.is_en_passant());
        assert_eq!(p.san(mv), "exd6");
    }

    #[test]
    fn castling_tokens() {
        let p = pos("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1");
        let short = resolve(&p, "O-O").unwrap();
        assert!(short.is_castle_kingside());
        assert_eq!(p.side_to_move(), Color::Black);
        assert_eq!(short.to_uci(), "e8g8");
        assert!(resolve(&p, "O-O-O").unwrap().is_castle_queenside());
        let no_rights = pos("r3k2r/8/8/8/8/8/8/R3K2R b - - 0 1");
        assert!(resolve(&no_rights, "O-O").is_err());
    }

    #[test]
    fn wrong_check_marker_still_resolves() {
        let start = Position::startpos();
        assert_eq!(resolve(&start, "e4+").unwrap().to_uci(), "e2e4");
        assert_eq!(resolve(&start, "e4#").unwrap().to_uci(), "e2e4");
    }

    #[test]
    fn capture_marker_requires_capture() {
        let start = Position::startpos();
        assert!(resolve(&start, "Nxf3").is_err());
    }

    #[test]
    fn san_marks_checkmate() {
        let p = pos("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let mv = resolve(&p, "Qh4").unwrap();
        assert_eq!(p.san(mv), "Qh4#");
    }
}
