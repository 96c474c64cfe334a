//! Minimal PGN loader: tag pairs, main-line SAN tokens and top-level
//! variations of the first game in the text.
//!
//! The loader is purely syntactic. Tokens are checked to be shaped like SAN
//! but not replayed; [`Game::final_position`] does that.

use log::debug;

use crate::board::Position;
use crate::error::{PgnError, SanError};
use crate::fork::get_board_after_moves;
use crate::san::San;

/// A parenthesized alternative to the main line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    /// Index of the main-line move this variation replaces
    pub ply: usize,
    pub moves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    tags: Vec<(String, String)>,
    initial: Position,
    moves: Vec<String>,
    variations: Vec<Variation>,
    result: Option<String>,
}

impl Game {
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Standard setup, or the position of the `FEN` tag.
    pub fn initial_position(&self) -> &Position {
        &self.initial
    }

    /// Main-line SAN tokens.
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn variations(&self) -> &[Variation] {
        &self.variations
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// Replays the main line.
    pub fn final_position(&self) -> Result<Position, SanError> {
        get_board_after_moves(&self.initial, &self.moves)
    }
}

impl AsRef<Position> for Game {
    fn as_ref(&self) -> &Position {
        &self.initial
    }
}

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Parses the first game found in `text`.
pub fn load_from_pgn(text: &str) -> Result<Game, PgnError> {
    let mut tags = Vec::new();
    let mut movetext = String::new();
    let mut in_movetext = false;

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('%') {
            continue;
        }
        if trimmed.starts_with('[') {
            if in_movetext {
                // Header of the next game
                break;
            }
            let tag = parse_tag(trimmed).ok_or_else(|| PgnError::MalformedTag {
                line: idx + 1,
                text: trimmed.to_string(),
            })?;
            tags.push(tag);
            continue;
        }
        if !trimmed.is_empty() {
            in_movetext = true;
        }
        movetext.push_str(line);
        movetext.push('\n');
    }

    let (moves, variations, result) = parse_movetext(&movetext)?;
    if tags.is_empty() && moves.is_empty() && result.is_none() {
        return Err(PgnError::Empty);
    }

    let initial = match tags.iter().find(|(k, _)| k == "FEN") {
        Some((_, fen)) => Position::from_fen(fen)?,
        None => Position::startpos(),
    };

    debug!(
        "loaded game: {} tags, {} moves, {} variations",
        tags.len(),
        moves.len(),
        variations.len()
    );

    Ok(Game {
        tags,
        initial,
        moves,
        variations,
        result,
    })
}

// [Name "Value"] with \" and \\ escapes inside the value
fn parse_tag(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (name, rest) = inner.split_once(char::is_whitespace)?;
    let quoted = rest.trim().strip_prefix('"')?.strip_suffix('"')?;

    let mut value = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            value.push(chars.next()?);
        } else {
            value.push(c);
        }
    }
    Some((name.to_string(), value))
}

type Movetext = (Vec<String>, Vec<Variation>, Option<String>);

fn parse_movetext(text: &str) -> Result<Movetext, PgnError> {
    let mut moves: Vec<String> = Vec::new();
    let mut variations: Vec<Variation> = Vec::new();
    let mut result = None;
    let mut depth = 0usize;
    let mut word = String::new();

    let mut chars = text.chars();
    loop {
        let c = chars.next();
        let delimiter = matches!(c, None | Some('{' | ';' | '(' | ')'))
            || c.is_some_and(char::is_whitespace);
        if !delimiter {
            word.extend(c);
            continue;
        }

        if !word.is_empty() {
            let token = std::mem::take(&mut word);
            if let Some(san) = movetext_word(&token)? {
                match depth {
                    0 if result.is_none() => moves.push(san),
                    0 => return Err(PgnError::UnexpectedToken(san)),
                    1 => {
                        if let Some(var) = variations.last_mut() {
                            var.moves.push(san);
                        }
                    }
                    _ => {}
                }
            } else if depth == 0 && RESULTS.contains(&token.as_str()) {
                result = Some(token);
            }
        }

        match c {
            None => break,
            Some('{') => {
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(PgnError::UnterminatedComment);
                }
            }
            Some(';') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            Some('(') => {
                depth += 1;
                if depth == 1 {
                    let ply = moves
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| PgnError::UnexpectedToken("(".to_string()))?;
                    variations.push(Variation {
                        ply,
                        moves: Vec::new(),
                    });
                }
            }
            Some(')') => {
                depth = depth.checked_sub(1).ok_or(PgnError::UnbalancedVariation)?;
            }
            Some(_) => {}
        }
    }

    if depth != 0 {
        return Err(PgnError::UnbalancedVariation);
    }
    Ok((moves, variations, result))
}

// Returns the SAN part of a movetext word, None for numbers, NAGs and results
fn movetext_word(word: &str) -> Result<Option<String>, PgnError> {
    if RESULTS.contains(&word) || word.starts_with('$') {
        return Ok(None);
    }
    if word.chars().all(|c| c == '!' || c == '?') {
        return Ok(None);
    }

    // Move numbers: "12." "12..." or glued to the move as in "12.e4"
    let digits = word.chars().take_while(char::is_ascii_digit).count();
    let san = if digits > 0 && word[digits..].starts_with('.') {
        word[digits..].trim_start_matches('.')
    } else {
        word
    };
    if san.is_empty() {
        return Ok(None);
    }

    match San::parse(san) {
        Some(_) => Ok(Some(san.to_string())),
        None => Err(PgnError::UnexpectedToken(word.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_moves_and_result() {
        let text = "[Event \"Casual\"]\n[White \"A \\\"quoted\\\" name\"]\n\n1. e4 e5 2. Nf3 {develops} Nc6 3.Bb5 a6 1-0\n";
        let game = load_from_pgn(text).unwrap();
        assert_eq!(game.tag("Event"), Some("Casual"));
        assert_eq!(game.tag("White"), Some("A \"quoted\" name"));
        assert_eq!(game.moves(), ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(game.result(), Some("1-0"));
        assert_eq!(game.initial_position(), &Position::startpos());
    }

    #[test]
    fn collects_top_level_variations() {
        let text = "1. e4 (1. d4 d5 (1... Nf6 2. c4)) 1... c5 $1 2. Nf3 ; sicilian\n2... d6 *";
        let game = load_from_pgn(text).unwrap();
        assert_eq!(game.moves(), ["e4", "c5", "Nf3", "d6"]);
        assert_eq!(
            game.variations(),
            [Variation {
                ply: 0,
                moves: vec!["d4".to_string(), "d5".to_string()],
            }]
        );
        assert_eq!(game.result(), Some("*"));
    }

    #[test]
    fn castling_with_zeros_is_a_move_not_a_number() {
        let text = "[FEN \"r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1\"]\n\n1. 0-0 0-0-0 *";
        let game = load_from_pgn(text).unwrap();
        assert_eq!(game.moves(), ["0-0", "0-0-0"]);
        let end = game.final_position().unwrap();
        assert_eq!(end.to_fen(), "2kr3r/8/8/8/8/8/8/R4RK1 w - - 2 2");
    }

    #[test]
    fn malformed_inputs() {
        assert_eq!(load_from_pgn("").unwrap_err(), PgnError::Empty);
        assert_eq!(load_from_pgn("  \n\n").unwrap_err(), PgnError::Empty);
        assert!(matches!(
            load_from_pgn("[Event Casual]\n1. e4 *"),
            Err(PgnError::MalformedTag { line: 1, .. })
        ));
        assert_eq!(
            load_from_pgn("1. e4 {never closed").unwrap_err(),
            PgnError::UnterminatedComment
        );
        assert_eq!(
            load_from_pgn("1. e4 (1. d4 *").unwrap_err(),
            PgnError::UnbalancedVariation
        );
        assert_eq!(
            load_from_pgn("1. e4 ) *").unwrap_err(),
            PgnError::UnbalancedVariation
        );
        assert!(matches!(
            load_from_pgn("1. e4 banana *"),
            Err(PgnError::UnexpectedToken(_))
        ));
        assert!(matches!(
            load_from_pgn("[FEN \"8/8/8/8/8/8/8/8 w - - 0 1\"]\n*"),
            Err(PgnError::Fen(_))
        ));
    }

    #[test]
    fn stops_at_next_game() {
        let text = "[Event \"one\"]\n\n1. e4 *\n\n[Event \"two\"]\n\n1. d4 *\n";
        let game = load_from_pgn(text).unwrap();
        assert_eq!(game.tag("Event"), Some("one"));
        assert_eq!(game.moves(), ["e4"]);
    }

    #[test]
    fn loader_does_not_check_legality() {
        let game = load_from_pgn("1. e5 *").unwrap();
        assert!(game.final_position().is_err());
    }
}
