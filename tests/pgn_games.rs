use forkscan::{check_fork_in_variant, get_board_after_moves, load_from_pgn, Position};
use pretty_assertions::assert_eq;

const MINIMAL_PGN: &str = "[Event \"?\"]\n[Site \"?\"]\n[Result \"*\"]\n\n*\n";

const FORK_PGN: &str = r#"[Event "Training"]
[White "White"]
[Black "Black"]
[Result "*"]

1. e4 e5 2. Nc3 Nc6 3. Nd5 Qh4 4. Bc4 {the quiet move}
(4. Nxc7+ Kd8 5. Nxa8 Qxe4+ 6. Ne2) 4... Nf6 *
"#;

#[test]
fn minimal_game_starts_from_the_standard_setup() {
    forkscan::init();
    let game = load_from_pgn(MINIMAL_PGN).unwrap();
    let empty: [&str; 0] = [];
    let pos = get_board_after_moves(&game, &empty).unwrap();
    assert_eq!(pos, Position::startpos());
    assert_eq!(game.result(), Some("*"));
}

#[test]
fn variation_from_a_game_contains_the_fork() {
    forkscan::init();
    let game = load_from_pgn(FORK_PGN).unwrap();
    assert_eq!(game.moves().len(), 8);

    let variation = &game.variations()[0];
    assert_eq!(variation.ply, 6);
    let branch = get_board_after_moves(&game, &game.moves()[..variation.ply]).unwrap();
    let (found, report) = check_fork_in_variant(&branch, &variation.moves).unwrap();
    assert!(found);
    assert_eq!(report.map(|r| r.token), Some("Nxc7+".to_string()));

    // The main line continues quietly
    let (found, _) = check_fork_in_variant(&branch, &game.moves()[variation.ply..]).unwrap();
    assert!(!found);
}

#[test]
fn fen_tag_sets_the_initial_position() {
    forkscan::init();
    let fen = "4k3/8/8/3q1r2/8/4N3/8/4K3 w - - 0 1";
    let text = format!("[SetUp \"1\"]\n[FEN \"{}\"]\n\n1. Nxd5 *\n", fen);
    let game = load_from_pgn(&text).unwrap();
    assert_eq!(game.initial_position().to_fen(), fen);
    assert_eq!(game.final_position().unwrap().to_fen(), "4k3/8/8/3N1r2/8/8/8/4K3 b - - 0 1");
}
