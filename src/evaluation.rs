//! Static evaluation of Tablut positions.
//!
//! The two sides are scored by different functions, so a score for white is not simply the negation of the score for black.

use board_game_traits::{Color, GameResult, Position as PositionTrait};

use crate::position::{Piece, Position, Square};

/// Score of a won game. Heuristic scores always lie strictly between `MIN_SCORE` and `MAX_SCORE`.
pub const MAX_SCORE: i32 = 1000;
pub const MIN_SCORE: i32 = -1000;
/// Marker for a missing table entry. Never returned by `evaluate`.
pub const UNKNOWN_SCORE: i32 = i32::MIN;

const WHITE_DRAW: i32 = 100;
const BLACK_DRAW: i32 = -100;

// White weights
const W_BLACK_PIECE: i32 = 55;
const W_WHITE_PIECE: i32 = 50;
const W_BEST_POSITION: i32 = 2;
const W_KING_ESCAPE: i32 = 10;
const W_KING_SURROUNDED: i32 = 10;
const W_KING_SURROUNDED_NEAR_THRONE: i32 = 5;

// Black weights
const B_BLACK_PIECE: i32 = 45;
const B_WHITE_PIECE: i32 = 50;
const B_KING_ESCAPE: i32 = 10;
const B_KING_SURROUNDED: i32 = 10;
const B_KING_SURROUNDED_NEAR_THRONE: i32 = 5;

/// Squares that block black's attack lanes, when white still has most of its soldiers.
const WHITE_BEST_SQUARES: [Square; 4] = [
    Square::from_xy(2, 3),
    Square::from_xy(3, 5),
    Square::from_xy(5, 3),
    Square::from_xy(6, 5),
];

/// Score of `position` from `player`'s point of view.
pub fn evaluate(position: &Position, player: Color) -> i32 {
    match (position.game_result(), player) {
        (Some(GameResult::WhiteWin), Color::White) | (Some(GameResult::BlackWin), Color::Black) => {
            MAX_SCORE
        }
        (Some(GameResult::WhiteWin), Color::Black) | (Some(GameResult::BlackWin), Color::White) => {
            MIN_SCORE
        }
        (Some(GameResult::Draw), _) => draw_score(position, player),
        (None, Color::White) => white_score(position),
        (None, Color::Black) => black_score(position),
    }
}

/// A draw is as bad as a loss for the side ahead on material, and a welcome compromise otherwise.
fn draw_score(position: &Position, player: Color) -> i32 {
    let white = position.white_soldiers();
    let black = position.black_soldiers();
    match player {
        Color::White if white > black => MIN_SCORE,
        Color::White => white_score(position) + WHITE_DRAW,
        Color::Black if white < black => MIN_SCORE,
        Color::Black => black_score(position) + BLACK_DRAW,
    }
}

fn white_score(position: &Position) -> i32 {
    let white_soldiers = position.white_soldiers() as i32;
    let mut score = king_escape_routes(position) * W_KING_ESCAPE;

    score += white_soldiers * W_WHITE_PIECE;
    score -= position.black_soldiers() as i32 * W_BLACK_PIECE;

    if white_soldiers >= 6 {
        score += white_in_best_squares(position) * W_BEST_POSITION;
    }

    let king = position.king_square();
    if king.is_throne() || king.is_next_to_throne() {
        score -= king_surrounding(position) * W_KING_SURROUNDED_NEAR_THRONE;
    } else {
        score -= king_surrounding(position) * W_KING_SURROUNDED;
    }

    if king.is_throne() {
        score += W_KING_ESCAPE;
    }
    score
}

fn black_score(position: &Position) -> i32 {
    let mut score = -king_escape_routes(position) * B_KING_ESCAPE;

    let king = position.king_square();
    if king.is_throne() || king.is_next_to_throne() {
        score += king_surrounding(position) * B_KING_SURROUNDED_NEAR_THRONE;
    } else {
        score += king_surrounding(position) * B_KING_SURROUNDED;
    }

    score += position.black_soldiers() as i32 * B_BLACK_PIECE;
    score -= position.white_soldiers() as i32 * B_WHITE_PIECE;
    score
}

/// Number of black soldiers next to the king.
pub fn king_surrounding(position: &Position) -> i32 {
    position
        .king_square()
        .neighbours()
        .filter(|square| position[*square] == Some(Piece::Black))
        .count() as i32
}

/// Number of open lines from the king to the edge, capped at 2. Always 0 while the king is in the centre 3x3 area.
pub fn king_escape_routes(position: &Position) -> i32 {
    let king = position.king_square();
    if (3..=5).contains(&king.x()) && (3..=5).contains(&king.y()) {
        return 0;
    }
    let open_lines = crate::position::Direction::ALL
        .into_iter()
        .filter(|direction| {
            let mut square = king;
            while let Some(next) = square.go_direction(*direction) {
                if !position.is_empty(next) {
                    return false;
                }
                square = next;
            }
            true
        })
        .count() as i32;
    open_lines.min(2)
}

fn white_in_best_squares(position: &Position) -> i32 {
    WHITE_BEST_SQUARES
        .iter()
        .filter(|square| position[**square] == Some(Piece::White))
        .count() as i32
}

/// A move is quiet if it did not capture anything.
pub fn is_quiet(before: &Position, after: &Position) -> bool {
    before.white_soldiers() == after.white_soldiers()
        && before.black_soldiers() == after.black_soldiers()
}
