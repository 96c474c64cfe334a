use forkscan::{
    check_fork_in_variant, get_board_after_moves, Color, ForkDetector, ForkRules, PieceKind,
    Position, SanError,
};
use pretty_assertions::assert_eq;

const OPENING: [&str; 6] = ["e4", "e5", "Nc3", "Nc6", "Nd5", "Qh4"];
const FORK_LINE: [&str; 5] = ["Nxc7+", "Kd8", "Nxa8", "Qxe4+", "Ne2"];

fn after_opening() -> Position {
    let _ = env_logger::builder().is_test(true).try_init();
    forkscan::init();
    get_board_after_moves(&Position::startpos(), &OPENING).expect("opening is legal")
}

// Color flip: ranks reversed, piece colors swapped, other side to move
fn mirror_fen(fen: &str) -> String {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let placement: Vec<String> = fields[0]
        .split('/')
        .rev()
        .map(|rank| {
            rank.chars()
                .map(|c| {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect()
        })
        .collect();
    let side = if fields[1] == "w" { "b" } else { "w" };
    let castling = if fields[2] == "-" {
        "-".to_string()
    } else {
        "KQkq"
            .chars()
            .filter(|c| {
                let flipped = if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                };
                fields[2].contains(flipped)
            })
            .collect()
    };
    let ep = mirror_token(fields[3]);
    format!("{} {} {} {} {} {}", placement.join("/"), side, castling, ep, fields[4], fields[5])
}

fn mirror_token(token: &str) -> String {
    token
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(rank @ 1..=8) => char::from_digit(9 - rank, 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[test]
fn knight_fork_winning_the_rook_is_found() {
    let pos = after_opening();
    let (found, report) = check_fork_in_variant(&pos, &FORK_LINE).unwrap();
    assert!(found);

    let report = report.expect("report");
    assert_eq!(report.ply, 0);
    assert_eq!(report.token, "Nxc7+");
    assert_eq!(report.piece.kind, PieceKind::Knight);
    assert_eq!(report.side(), Color::White);
    assert_eq!(report.square.to_string(), "c7");
    assert!(report.gives_check);
    assert_eq!(report.won_at, Some(2));
    let squares: Vec<String> = report.forked_squares().iter().map(|s| s.to_string()).collect();
    assert_eq!(squares, vec!["a8", "e8"]);
}

#[test]
fn fork_line_cut_before_the_capture_is_not_a_fork() {
    let pos = after_opening();
    let (found, report) = check_fork_in_variant(&pos, &["Nxc7+", "Kd8"]).unwrap();
    assert!(!found);
    assert_eq!(report, None);
}

#[test]
fn baseline_rules_need_two_pieces() {
    // Only the king and the rook are hit, the king is not a piece under the baseline
    let pos = after_opening();
    let detector = ForkDetector::new(ForkRules::baseline());
    assert_eq!(detector.scan(&pos, &FORK_LINE).unwrap(), None);
}

#[test]
fn immediate_reporting_without_win() {
    let pos = after_opening();
    let detector = ForkDetector::new(ForkRules::new().require_win(false));
    let report = detector.scan(&pos, &["Nxc7+", "Kd8"]).unwrap().expect("fork");
    assert_eq!(report.ply, 0);
    assert_eq!(report.won_at, None);
}

#[test]
fn fork_detection_is_color_symmetric() {
    let pos = after_opening();
    let mirrored = Position::from_fen(&mirror_fen(&pos.to_fen())).unwrap();

    for line in [&FORK_LINE[..], &FORK_LINE[..2], &FORK_LINE[..3]] {
        let flipped: Vec<String> = line.iter().map(|t| mirror_token(t)).collect();
        let (expected, _) = check_fork_in_variant(&pos, line).unwrap();
        let (got, _) = check_fork_in_variant(&mirrored, &flipped).unwrap();
        assert_eq!(got, expected, "line {:?}", line);
    }
}

#[test]
fn illegal_token_mid_variation_is_an_error() {
    let pos = after_opening();
    let err = check_fork_in_variant(&pos, &["Nxc7+", "Kf7"]).unwrap_err();
    assert!(matches!(err, SanError::IllegalMove { ref token, .. } if token == "Kf7"));

    let err = get_board_after_moves(&pos, &["Nf3", "Qxe4+", "Nxe5"]).unwrap_err();
    assert!(matches!(err, SanError::IllegalMove { .. }));
}

#[test]
fn ambiguous_token_is_an_error() {
    forkscan::init();
    let pos = Position::from_fen("1k6/8/8/8/8/8/8/R5RK w - - 0 1").unwrap();
    match get_board_after_moves(&pos, &["Rd1"]) {
        Err(SanError::AmbiguousMove { token, mut candidates }) => {
            candidates.sort();
            assert_eq!(token, "Rd1");
            assert_eq!(candidates, vec!["a1d1", "g1d1"]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
    assert!(get_board_after_moves(&pos, &["R1d1"]).is_err());
    let after = get_board_after_moves(&pos, &["Rad1"]).unwrap();
    assert_eq!(after.to_fen(), "1k6/8/8/8/8/8/8/3R2RK b - - 1 1");
}

#[test]
fn empty_move_list_returns_the_start() {
    let pos = after_opening();
    let empty: [&str; 0] = [];
    assert_eq!(get_board_after_moves(&pos, &empty).unwrap(), pos);
}

#[test]
fn replay_matches_stepwise_apply() {
    let pos = after_opening();
    let mut stepped = pos.clone();
    for token in FORK_LINE {
        let mv = forkscan::resolve(&stepped, token).unwrap();
        stepped = stepped.apply(mv);
    }
    assert_eq!(get_board_after_moves(&pos, &FORK_LINE).unwrap(), stepped);
}

// Knight on g4, black queen d7 and rook f7
const QUEEN_ROOK_FEN: &str = "4k3/3q1r2/8/8/6N1/8/8/4K3 w - - 0 1";

#[test]
fn line_ending_on_the_fork_is_found() {
    forkscan::init();
    let pos = Position::from_fen(QUEEN_ROOK_FEN).unwrap();
    let (found, report) = check_fork_in_variant(&pos, &["Ne5"]).unwrap();
    assert!(found);

    let report = report.expect("report");
    assert_eq!(report.ply, 0);
    assert!(!report.gives_check);
    assert_eq!(report.won_at, None);
    let squares: Vec<String> = report.forked_squares().iter().map(|s| s.to_string()).collect();
    assert_eq!(squares, vec!["d7", "f7"]);
}

#[test]
fn fork_followed_by_a_quiet_reply_is_found() {
    forkscan::init();
    let pos = Position::from_fen(QUEEN_ROOK_FEN).unwrap();
    for line in [&["Ne5", "Kd8"][..], &["Ne5", "Kd8", "Nxd7"][..]] {
        let (found, report) = check_fork_in_variant(&pos, line).unwrap();
        assert!(found, "line {:?}", line);
        assert_eq!(report.map(|r| r.token), Some("Ne5".to_string()));
    }
}

#[test]
fn replay_from_saturated_counters() {
    forkscan::init();
    let pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 65535 1").unwrap();
    let after = get_board_after_moves(&pos, &["Kd2"]).unwrap();
    assert_eq!(after.halfmove_clock(), u16::MAX);
    assert_eq!(after.pieces(PieceKind::King, Color::White).len(), 1);
}
