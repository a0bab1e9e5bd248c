use board_game_traits::{Color, Position as PositionTrait};

use crate::evaluation;
use crate::position::{Move, Position};
use crate::search::Game;

/// Ashton Tablut, as seen by the search.
///
/// Scores come from `evaluation`, so wins are `MAX_SCORE`, losses `MIN_SCORE`, and everything else lies in between.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tablut;

impl Game for Tablut {
    type State = Position;
    type Action = Move;
    type Player = Color;
    type Utility = i32;

    fn initial_state(&self) -> Position {
        Position::start_position()
    }

    fn player(&self, state: &Position) -> Color {
        state.side_to_move()
    }

    fn actions(&self, state: &Position) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        state.generate_moves(&mut moves);
        moves
    }

    fn result(&self, state: &Position, action: &Move) -> Position {
        let mut child = state.clone();
        child.do_move(*action);
        child
    }

    fn is_terminal(&self, state: &Position) -> bool {
        state.game_result().is_some()
    }

    fn utility(&self, state: &Position, player: Color) -> i32 {
        evaluation::evaluate(state, player)
    }

    fn is_quiet(&self, before: &Position, after: &Position) -> bool {
        evaluation::is_quiet(before, after)
    }

    fn util_min(&self) -> i32 {
        evaluation::MIN_SCORE
    }

    fn util_max(&self) -> i32 {
        evaluation::MAX_SCORE
    }

    fn util_unknown(&self) -> i32 {
        evaluation::UNKNOWN_SCORE
    }
}
