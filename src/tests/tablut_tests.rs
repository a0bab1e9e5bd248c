use std::time::Duration;

use board_game_traits::{Color, GameResult, Position as PositionTrait};
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::evaluation;
use crate::position::{Move, Position, Square, Tablut};
use crate::search::{Game, Search, SearchSetting, TacticalHooks, Termination, ZobristHash};
use crate::tests::{do_moves_and_check_validity, legal_moves, position_from_diagram};

const START: &str = "
    ...BBB...
    ....B....
    ....W....
    B...W...B
    BBWWKWWBB
    B...W...B
    ....W....
    ....B....
    ...BBB...";

fn mv(input: &str) -> Move {
    input.parse().unwrap()
}

fn square(input: &str) -> Square {
    input.parse().unwrap()
}

#[test]
fn start_position_test() {
    let position = Position::start_position();
    assert_eq!(position, position_from_diagram(START, Color::White));
    assert_eq!(position.side_to_move(), Color::White);
    assert_eq!(position.white_soldiers(), 8);
    assert_eq!(position.black_soldiers(), 16);
    assert_eq!(position.king_square(), square("e5"));
    assert_eq!(position.king_square(), Square::THRONE);
    assert_eq!(position.game_result(), None);
    assert_eq!(position.hash_history(), &[position.zobrist_hash()]);
}

#[test]
fn start_move_count_test() {
    assert_eq!(legal_moves(&Position::start_position()).len(), 56);
    assert_eq!(
        legal_moves(&position_from_diagram(START, Color::Black)).len(),
        80
    );
}

#[test]
fn square_and_move_notation_test() {
    assert_eq!(square("a1"), Square::from_xy(0, 0));
    assert_eq!(square("i9"), Square::from_xy(8, 8));
    assert_eq!(square("e5").to_string(), "e5");
    assert!("j1".parse::<Square>().is_err());
    assert!("a0".parse::<Square>().is_err());
    assert!("a10".parse::<Square>().is_err());

    assert_eq!(mv("e4-e7").to_string(), "e4-e7");
    assert_eq!(mv("e4-e7").from(), square("e4"));
    assert_eq!(mv("e4-e7").to(), square("e7"));
    assert!("e4-f5".parse::<Move>().is_err());
    assert!("e4-e4".parse::<Move>().is_err());
    assert!("e4e7".parse::<Move>().is_err());
}

#[test]
fn camp_squares_test() {
    let camps = Square::squares_iterator().filter(|square| square.is_camp()).count();
    assert_eq!(camps, 16);
    assert!(!Square::THRONE.is_camp());
    assert_eq!(square("e2").camp(), square("d1").camp());
    assert_ne!(square("e2").camp(), square("b5").camp());
    assert_eq!(square("e5").camp(), None);
}

#[test]
fn camps_and_throne_block_movement_test() {
    let diagram = "
        ..B......
        ....B....
        ....W....
        .........
        .........
        ..W......
        ....K....
        .........
        .........";

    let black_moves = legal_moves(&position_from_diagram(diagram, Color::Black));
    // Inside the starting camp
    assert!(black_moves.contains(&mv("e2-e1")));
    assert!(black_moves.contains(&mv("e2-d2")));
    // Into a camp from outside
    assert!(!black_moves.contains(&mv("c1-d1")));

    let white_moves = legal_moves(&position_from_diagram(diagram, Color::White));
    assert!(white_moves.contains(&mv("c6-b6")));
    assert!(!white_moves.contains(&mv("c6-a6")));
    assert!(white_moves.contains(&mv("e3-e4")));
    assert!(!white_moves.contains(&mv("e3-e6")));
    assert!(!white_moves.contains(&mv("e3-e2")));
    // The king may not go back to the throne
    assert!(white_moves.contains(&mv("e7-e6")));
    assert!(!white_moves.contains(&mv("e7-e5")));
    assert!(!white_moves.contains(&mv("e7-e8")));
}

#[test]
fn capture_between_soldiers_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        ..BW...B.
        .........
        .........
        .........
        ......K..
        .........
        .........",
        Color::Black,
    );
    let original = position.clone();
    let reverse_move = position.do_move(mv("h3-e3"));
    assert_eq!(position[square("d3")], None);
    assert_eq!(position.white_soldiers(), 0);
    assert_eq!(position.game_result(), None);
    assert_eq!(position.hash_history(), &[position.zobrist_hash()]);
    assert_eq!(position.zobrist_hash(), position.hash_from_scratch());

    position.reverse_move(reverse_move);
    assert_eq!(position, original);
    assert_eq!(position.zobrist_hash(), original.zobrist_hash());
    assert_eq!(position.hash_history(), original.hash_history());
    assert_eq!(position.white_soldiers(), 1);
}

#[test]
fn capture_against_empty_camp_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        .........
        .........
        .........
        .W.......
        ......K..
        .........
        ..B......",
        Color::Black,
    );
    do_moves_and_check_validity(&mut position, &["c9-c6"]);
    assert_eq!(position[square("b6")], None);
    assert_eq!(position.white_soldiers(), 0);
}

#[test]
fn capture_against_empty_throne_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        .......B.
        ....W....
        .........
        .........
        ......K..
        .........
        .........",
        Color::Black,
    );
    do_moves_and_check_validity(&mut position, &["h3-e3"]);
    assert_eq!(position[square("e4")], None);
}

#[test]
fn king_helps_capture_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        .........
        .........
        .........
        .........
        ..W..BK..
        .........
        ........B",
        Color::White,
    );
    do_moves_and_check_validity(&mut position, &["c7-e7"]);
    assert_eq!(position[square("f7")], None);
    assert_eq!(position.black_soldiers(), 1);
    assert_eq!(position.game_result(), None);
}

#[test]
fn moving_between_enemies_is_safe_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        ......B..
        .......W.
        ......B..
        .........
        ..K......
        .........
        .........",
        Color::White,
    );
    do_moves_and_check_validity(&mut position, &["h4-g4"]);
    assert_eq!(position[square("g4")], Some(crate::position::Piece::White));
    assert_eq!(position.white_soldiers(), 1);
}

#[test]
fn king_captured_on_throne_test() {
    let diagram = "
        .........
        .........
        .........
        ....B....
        ...BKB...
        ..B......
        .........
        .........
        .........";
    let mut position = position_from_diagram(diagram, Color::Black);
    do_moves_and_check_validity(&mut position, &["c6-e6"]);
    assert_eq!(position.game_result(), Some(GameResult::BlackWin));

    // Three attackers are not enough on the throne
    let mut position = position_from_diagram(&diagram.replace("...BKB...", "...BK...."), Color::Black);
    do_moves_and_check_validity(&mut position, &["c6-e6"]);
    assert_eq!(position.game_result(), None);
}

#[test]
fn king_captured_next_to_throne_test() {
    let diagram = "
        .........
        .........
        .......B.
        ...BKB...
        .........
        .........
        .........
        .........
        .........";
    let mut position = position_from_diagram(diagram, Color::Black);
    do_moves_and_check_validity(&mut position, &["h3-e3"]);
    assert_eq!(position.game_result(), Some(GameResult::BlackWin));

    let mut position = position_from_diagram(&diagram.replace("...BKB...", "...BK...."), Color::Black);
    do_moves_and_check_validity(&mut position, &["h3-e3"]);
    assert_eq!(position.game_result(), None);
}

#[test]
fn king_captured_away_from_throne_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        .........
        .........
        .........
        .........
        ..B...KB.
        .........
        .........",
        Color::Black,
    );
    do_moves_and_check_validity(&mut position, &["c7-f7"]);
    assert_eq!(position.game_result(), Some(GameResult::BlackWin));
}

#[test]
fn king_captured_against_camp_test() {
    let mut position = position_from_diagram(
        "
        ..B......
        .........
        .........
        .K.......
        .........
        .........
        .........
        .........
        .........",
        Color::Black,
    );
    do_moves_and_check_validity(&mut position, &["c1-c4"]);
    assert_eq!(position.game_result(), Some(GameResult::BlackWin));
}

#[test]
fn king_escapes_to_edge_test() {
    let diagram = "
        B........
        .........
        .........
        .........
        .........
        .........
        ......K..
        .........
        .........";
    for escape in ["g7-i7", "g7-g9", "g7-a7"] {
        let mut position = position_from_diagram(diagram, Color::White);
        do_moves_and_check_validity(&mut position, &[escape]);
        assert_eq!(position.game_result(), Some(GameResult::WhiteWin), "{}", escape);
        assert!(legal_moves(&position).is_empty());
    }
}

#[test]
fn player_without_moves_loses_test() {
    let mut position = position_from_diagram(
        "
        BW.......
        .........
        W........
        .........
        .........
        .........
        ......K..
        .........
        .........",
        Color::White,
    );
    do_moves_and_check_validity(&mut position, &["a3-a2"]);
    assert_eq!(position.black_soldiers(), 1);
    assert_eq!(position.game_result(), Some(GameResult::WhiteWin));
}

#[test]
fn repetition_is_draw_test() {
    let mut position = position_from_diagram(
        "
        .........
        .........
        ......W..
        ....K....
        .........
        .........
        ..B......
        .........
        .........",
        Color::White,
    );
    let start_hash = position.zobrist_hash();
    do_moves_and_check_validity(&mut position, &["g3-g2", "c7-c8", "g2-g3"]);
    assert_eq!(position.game_result(), None);
    do_moves_and_check_validity(&mut position, &["c8-c7"]);
    assert_eq!(position.zobrist_hash(), start_hash);
    assert_eq!(position.game_result(), Some(GameResult::Draw));
    assert_eq!(position.hash_history().len(), 5);
}

#[test]
fn carried_history_detects_repetition_test() {
    let diagram = "
        .........
        .........
        ......W..
        ....K....
        .........
        .........
        ..B......
        .........
        .........";
    let earlier = position_from_diagram(diagram, Color::White);
    let mut position = position_from_diagram(&diagram.replace("......W..", "........."), Color::White);
    position.set_hash_history(vec![earlier.zobrist_hash()]);
    assert_eq!(position.hash_history().len(), 2);
    assert_eq!(position.hash_history().last(), Some(&position.zobrist_hash()));
    // Setting the same history twice does not duplicate the current hash
    let history = position.hash_history().to_vec();
    position.set_hash_history(history.clone());
    assert_eq!(position.hash_history(), &history[..]);
}

#[test]
fn random_playout_keeps_hash_consistent_test() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    for _ in 0..5 {
        let mut position = Position::start_position();
        let mut reverse_moves = vec![];
        for _ in 0..200 {
            let moves = legal_moves(&position);
            let Some(mv) = moves.choose(&mut rng) else {
                break;
            };
            reverse_moves.push(position.do_move(*mv));
            assert_eq!(position.zobrist_hash(), position.hash_from_scratch());
            assert_eq!(position.hash_history().last(), Some(&position.zobrist_hash()));
            assert!(position.white_soldiers() <= 8 && position.black_soldiers() <= 16);
        }
        while let Some(reverse_move) = reverse_moves.pop() {
            position.reverse_move(reverse_move);
            assert_eq!(position.zobrist_hash(), position.hash_from_scratch());
        }
        assert_eq!(position, Position::start_position());
        assert_eq!(position.hash_history(), &[position.zobrist_hash()]);
    }
}

#[test]
fn tablut_game_test() {
    let game = Tablut;
    let start = game.initial_state();
    assert_eq!(game.player(&start), Color::White);
    assert_eq!(game.actions(&start).len(), 56);
    assert!(!game.is_terminal(&start));
    assert_eq!(game.utility(&start, Color::White), evaluation::evaluate(&start, Color::White));

    let child = game.result(&start, &mv("e3-a3"));
    assert_eq!(start, Position::start_position());
    assert_eq!(game.player(&child), Color::Black);
    assert!(game.is_quiet(&start, &child));
    assert!(game.util_min() < game.utility(&child, Color::Black));
    assert!(game.util_max() > game.utility(&child, Color::Black));
}

#[test]
fn search_finds_king_escape_test() {
    let position = position_from_diagram(
        "
        B........
        .B.......
        .........
        .........
        .........
        .........
        ......K..
        .........
        .........",
        Color::White,
    );
    let mut search = Search::new(&Tablut, 1, Duration::from_secs(5)).unwrap();
    let (best, utility) = search.make_decision(&position).unwrap();
    assert_eq!(utility, evaluation::MAX_SCORE);
    assert_eq!(
        Tablut.result(&position, &best).game_result(),
        Some(GameResult::WhiteWin)
    );
    assert_eq!(search.depth_reached(), 1);

    let settings = SearchSetting::default().termination(Termination::FixedDepth);
    let mut search = Search::with_settings(&Tablut, 2, Duration::from_secs(5), settings)
        .unwrap()
        .with_hooks(TacticalHooks);
    let (best, utility) = search.make_decision(&position).unwrap();
    assert_eq!(utility, evaluation::MAX_SCORE - 1);
    assert_eq!(
        Tablut.result(&position, &best).game_result(),
        Some(GameResult::WhiteWin)
    );
}

#[test]
fn search_finds_king_capture_test() {
    let position = position_from_diagram(
        "
        .........
        .........
        .........
        .........
        .........
        .........
        ..B...KB.
        .........
        .........",
        Color::Black,
    );
    let mut search = Search::new(&Tablut, 1, Duration::from_secs(5)).unwrap();
    let (best, utility) = search.make_decision(&position).unwrap();
    assert_eq!(best, mv("c7-f7"));
    assert_eq!(utility, evaluation::MAX_SCORE);
}

#[test]
fn search_from_start_gives_legal_move_test() {
    let position = Position::start_position();
    let mut search = Search::new(&Tablut, 2, Duration::from_millis(500))
        .unwrap()
        .with_hooks(TacticalHooks);
    let (best, _) = search.make_decision(&position).unwrap();
    assert!(legal_moves(&position).contains(&best));
}
