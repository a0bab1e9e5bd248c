use board_game_traits::{Color, GameResult, Position as PositionTrait};

use crate::evaluation::{self, king_escape_routes, king_surrounding, MAX_SCORE, MIN_SCORE};
use crate::position::Position;
use crate::tests::{cells_from_diagram, do_moves_and_check_validity, position_from_diagram};

#[test]
fn start_position_scores_test() {
    let position = Position::start_position();
    assert_eq!(king_escape_routes(&position), 0);
    assert_eq!(king_surrounding(&position), 0);
    assert_eq!(evaluation::evaluate(&position, Color::White), -470);
    assert_eq!(evaluation::evaluate(&position, Color::Black), 320);
}

#[test]
fn surrounded_king_test() {
    let position = position_from_diagram(
        "
        .........
        .........
        .........
        .........
        .........
        .........
        ......KB.
        ......B..
        .........",
        Color::White,
    );
    assert_eq!(king_surrounding(&position), 2);
    assert_eq!(king_escape_routes(&position), 2);
    assert_eq!(evaluation::evaluate(&position, Color::White), -110);
    assert_eq!(evaluation::evaluate(&position, Color::Black), 90);
}

#[test]
fn escape_routes_test() {
    let position = position_from_diagram(
        "
        ..B......
        .........
        B.K..W...
        .........
        .........
        .........
        .........
        .........
        .........",
        Color::White,
    );
    assert_eq!(king_escape_routes(&position), 1);
}

#[test]
fn decided_games_score_extremes_test() {
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
    assert_eq!(evaluation::evaluate(&position, Color::Black), MAX_SCORE);
    assert_eq!(evaluation::evaluate(&position, Color::White), MIN_SCORE);
}

#[test]
fn draw_is_a_loss_for_side_ahead_test() {
    let white_ahead = Position::from_cells(
        cells_from_diagram(
            "
            .........
            .........
            ..W......
            .........
            .........
            ......W..
            ......K..
            .........
            ..B......",
        ),
        Color::White,
        Some(GameResult::Draw),
    )
    .unwrap();
    assert_eq!(evaluation::evaluate(&white_ahead, Color::White), MIN_SCORE);
    assert!(evaluation::evaluate(&white_ahead, Color::Black) > MIN_SCORE);

    let black_ahead = Position::from_cells(
        cells_from_diagram(
            "
            .........
            .........
            ..B......
            .........
            .........
            ......B..
            ......K..
            .........
            ..W......",
        ),
        Color::White,
        Some(GameResult::Draw),
    )
    .unwrap();
    assert_eq!(evaluation::evaluate(&black_ahead, Color::Black), MIN_SCORE);
    assert!(evaluation::evaluate(&black_ahead, Color::White) > MIN_SCORE);
}

#[test]
fn captures_are_not_quiet_test() {
    let before = position_from_diagram(
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
    let mut after = before.clone();
    do_moves_and_check_validity(&mut after, &["h3-e3"]);
    assert!(!evaluation::is_quiet(&before, &after));

    let mut after = before.clone();
    do_moves_and_check_validity(&mut after, &["h3-h4"]);
    assert!(evaluation::is_quiet(&before, &after));
}
