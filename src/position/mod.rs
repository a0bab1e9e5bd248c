//! Ashton Tablut rules and move generation.
//!
//! Black (the attackers) starts with 16 soldiers in the four camps. White (the defenders) has 8 soldiers around the king, who starts on the throne. White moves first.
//! White wins by bringing the king to any edge square. Black wins by capturing the king. A player without legal moves loses, and repeating a position since the last capture is a draw.

use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};
use std::sync::LazyLock;

use arrayvec::ArrayVec;
use board_game_traits::{Color, GameResult, Position as PositionTrait};
use rand::{Rng, SeedableRng};

use crate::search::ZobristHash;

pub use mv::Move;
pub use square::{Camp, Direction, Square, BOARD_SIZE, NUM_SQUARES};
pub use tablut::Tablut;

mod mv;
mod square;
mod tablut;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Piece {
    Black = 0,
    White = 1,
    King = 2,
}

impl Piece {
    pub fn color(self) -> Color {
        match self {
            Piece::Black => Color::Black,
            Piece::White | Piece::King => Color::White,
        }
    }

    pub fn is_soldier_of(self, color: Color) -> bool {
        matches!(
            (self, color),
            (Piece::Black, Color::Black) | (Piece::White, Color::White)
        )
    }
}

const WHITE_START: [Square; 8] = [
    Square::from_xy(4, 2),
    Square::from_xy(4, 3),
    Square::from_xy(4, 5),
    Square::from_xy(4, 6),
    Square::from_xy(2, 4),
    Square::from_xy(3, 4),
    Square::from_xy(5, 4),
    Square::from_xy(6, 4),
];

static ZOBRIST_KEYS: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::new);

struct ZobristKeys {
    pieces: [[u64; 3]; NUM_SQUARES],
    to_move: [u64; 2],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xAAAA_AAAA_AAAA_AAAA);
        let mut pieces = [[0; 3]; NUM_SQUARES];
        for keys in pieces.iter_mut() {
            for key in keys.iter_mut() {
                *key = rng.gen();
            }
        }
        ZobristKeys {
            pieces,
            to_move: [rng.gen(), rng.gen()],
        }
    }
}

fn zobrist_piece(square: Square, piece: Piece) -> u64 {
    ZOBRIST_KEYS.pieces[square.into_inner() as usize][piece as usize]
}

fn zobrist_to_move(color: Color) -> u64 {
    ZOBRIST_KEYS.to_move[color as usize]
}

/// Complete representation of a Tablut position, including the repetition history
#[derive(Clone)]
pub struct Position {
    cells: [Option<Piece>; NUM_SQUARES],
    to_move: Color,
    king: Square,
    white_soldiers: u8,
    black_soldiers: u8,
    result: Option<GameResult>,
    hash: u64, // Zobrist hash of the current position
    hash_history: Vec<u64>, // Hashes of every position since the last capture, including the current one
}

/// Everything needed to take back a move with `reverse_move`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReverseMove {
    mv: Move,
    captured: ArrayVec<Square, 3>,
    previous_result: Option<GameResult>,
    /// Set if the move captured, which wipes the repetition history
    previous_history: Option<Vec<u64>>,
}

impl Index<Square> for Position {
    type Output = Option<Piece>;

    fn index(&self, square: Square) -> &Self::Output {
        &self.cells[square.into_inner() as usize]
    }
}

impl IndexMut<Square> for Position {
    fn index_mut(&mut self, square: Square) -> &mut Self::Output {
        &mut self.cells[square.into_inner() as usize]
    }
}

impl Default for Position {
    fn default() -> Self {
        let mut cells = [None; NUM_SQUARES];
        for square in Square::squares_iterator() {
            if square.is_camp() {
                cells[square.into_inner() as usize] = Some(Piece::Black);
            }
        }
        for square in WHITE_START {
            cells[square.into_inner() as usize] = Some(Piece::White);
        }
        cells[Square::THRONE.into_inner() as usize] = Some(Piece::King);
        Position::from_cells(cells, Color::White, None).unwrap_or_else(|| {
            unreachable!("The start position always has a king")
        })
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells && self.to_move == other.to_move && self.result == other.result
    }
}

impl Eq for Position {}

impl Position {
    /// Builds a position from a board, for example one received from a server.
    /// Returns `None` if the board has no king, or more than one.
    pub fn from_cells(
        cells: [Option<Piece>; NUM_SQUARES],
        to_move: Color,
        result: Option<GameResult>,
    ) -> Option<Self> {
        let mut kings = Square::squares_iterator().filter(|square| {
            cells[square.into_inner() as usize] == Some(Piece::King)
        });
        let king = kings.next()?;
        if kings.next().is_some() {
            return None;
        }
        let count = |piece| cells.iter().filter(|cell| **cell == Some(piece)).count() as u8;
        let mut position = Position {
            cells,
            to_move,
            king,
            white_soldiers: count(Piece::White),
            black_soldiers: count(Piece::Black),
            result,
            hash: 0,
            hash_history: vec![],
        };
        position.hash = position.hash_from_scratch();
        position.hash_history.push(position.hash);
        Some(position)
    }

    pub fn hash_from_scratch(&self) -> u64 {
        let mut hash = zobrist_to_move(self.to_move);
        for square in Square::squares_iterator() {
            if let Some(piece) = self[square] {
                hash ^= zobrist_piece(square, piece);
            }
        }
        hash
    }

    pub fn king_square(&self) -> Square {
        self.king
    }

    pub fn white_soldiers(&self) -> u8 {
        self.white_soldiers
    }

    pub fn black_soldiers(&self) -> u8 {
        self.black_soldiers
    }

    pub fn hash_history(&self) -> &[u64] {
        &self.hash_history
    }

    /// Replaces the repetition history, for positions that continue an earlier game.
    /// The current position's hash is appended if missing.
    pub fn set_hash_history(&mut self, mut history: Vec<u64>) {
        if history.last() != Some(&self.hash) {
            history.push(self.hash);
        }
        self.hash_history = history;
    }

    pub fn is_empty(&self, square: Square) -> bool {
        self[square].is_none()
    }

    /// Whether a piece of `color` moving from `from` may stop on, or pass through, `to`.
    fn can_enter(&self, from: Square, to: Square, color: Color) -> bool {
        if to.is_throne() || !self.is_empty(to) {
            return false;
        }
        match to.camp() {
            None => true,
            // Black soldiers may move inside the camp they started in, but never re-enter one
            Some(camp) => color == Color::Black && from.camp() == Some(camp),
        }
    }

    fn moves_from(&self, from: Square, color: Color, moves: &mut Vec<Move>) {
        for direction in Direction::ALL {
            let mut to = from;
            while let Some(next) = to.go_direction(direction) {
                if !self.can_enter(from, next, color) {
                    break;
                }
                moves.push(Move::new(from, next));
                to = next;
            }
        }
    }

    pub fn has_legal_move(&self, color: Color) -> bool {
        Square::squares_iterator().any(|from| {
            self[from].is_some_and(|piece| piece.color() == color)
                && from
                    .neighbours()
                    .any(|to| self.can_enter(from, to, color))
        })
    }

    /// Whether `square` counts as an anvil when capturing a soldier of `victim`'s color.
    fn is_hostile_to(&self, square: Square, victim: Color) -> bool {
        match self[square] {
            Some(piece) => piece.color() != victim,
            None => square.is_throne() || square.is_camp(),
        }
    }

    /// Whether a black soldier arriving next to the king, from the opposite side of `direction`, captures it.
    fn king_is_captured(&self, king: Square, direction: Direction) -> bool {
        let is_black = |square: Square| self[square] == Some(Piece::Black);
        if king.is_throne() {
            king.neighbours().all(is_black)
        } else if king.is_next_to_throne() {
            king.neighbours()
                .all(|square| is_black(square) || square.is_throne())
        } else {
            king.go_direction(direction).is_some_and(|anvil| {
                is_black(anvil) || (anvil.is_camp() && self.is_empty(anvil))
            })
        }
    }

    fn remove_soldier(&mut self, square: Square) {
        if let Some(piece) = self[square].take() {
            self.hash ^= zobrist_piece(square, piece);
            match piece {
                Piece::White => self.white_soldiers -= 1,
                Piece::Black => self.black_soldiers -= 1,
                Piece::King => unreachable!("The king is never removed from the board"),
            }
        }
    }

    fn place(&mut self, square: Square, piece: Piece) {
        debug_assert!(self.is_empty(square));
        self[square] = Some(piece);
        self.hash ^= zobrist_piece(square, piece);
        match piece {
            Piece::White => self.white_soldiers += 1,
            Piece::Black => self.black_soldiers += 1,
            Piece::King => self.king = square,
        }
    }

    fn move_piece(&mut self, from: Square, to: Square) -> Option<Piece> {
        let piece = self[from].take()?;
        self[to] = Some(piece);
        self.hash ^= zobrist_piece(from, piece) ^ zobrist_piece(to, piece);
        if piece == Piece::King {
            self.king = to;
        }
        Some(piece)
    }

    fn flip_side_to_move(&mut self) {
        self.hash ^= zobrist_to_move(self.to_move);
        self.to_move = !self.to_move;
        self.hash ^= zobrist_to_move(self.to_move);
    }
}

impl ZobristHash for Position {
    fn zobrist_hash(&self) -> u64 {
        self.hash
    }
}

impl PositionTrait for Position {
    type Move = Move;
    type ReverseMove = ReverseMove;

    fn start_position() -> Self {
        Self::default()
    }

    fn side_to_move(&self) -> Color {
        self.to_move
    }

    /// Adds all legal moves to the provided vector. No moves are generated once the game is over.
    fn generate_moves(&self, moves: &mut Vec<Self::Move>) {
        if self.result.is_some() {
            return;
        }
        let color = self.to_move;
        for from in Square::squares_iterator() {
            if self[from].is_some_and(|piece| piece.color() == color) {
                self.moves_from(from, color, moves);
            }
        }
    }

    fn do_move(&mut self, mv: Self::Move) -> Self::ReverseMove {
        let mover = self.to_move;
        let previous_result = self.result;
        let mut captured = ArrayVec::new();
        let mut result = None;

        let piece = self.move_piece(mv.from(), mv.to());
        debug_assert!(piece.is_some_and(|piece| piece.color() == mover), "Illegal move {}", mv);

        if piece == Some(Piece::King) && mv.to().is_edge() {
            result = Some(GameResult::WhiteWin);
        } else {
            for direction in Direction::ALL {
                let Some(victim) = mv.to().go_direction(direction) else {
                    continue;
                };
                match self[victim] {
                    Some(Piece::King) if mover == Color::Black => {
                        if self.king_is_captured(victim, direction) {
                            result = Some(GameResult::BlackWin);
                        }
                    }
                    Some(target) if target.is_soldier_of(!mover) => {
                        if victim
                            .go_direction(direction)
                            .is_some_and(|anvil| self.is_hostile_to(anvil, !mover))
                        {
                            self.remove_soldier(victim);
                            captured.push(victim);
                        }
                    }
                    _ => (),
                }
            }
        }

        self.flip_side_to_move();

        if result.is_none() && !self.has_legal_move(self.to_move) {
            result = Some(match mover {
                Color::White => GameResult::WhiteWin,
                Color::Black => GameResult::BlackWin,
            });
        }

        let previous_history = if captured.is_empty() {
            if result.is_none() && self.hash_history.contains(&self.hash) {
                result = Some(GameResult::Draw);
            }
            self.hash_history.push(self.hash);
            None
        } else {
            Some(mem::replace(&mut self.hash_history, vec![self.hash]))
        };

        self.result = result;

        ReverseMove {
            mv,
            captured,
            previous_result,
            previous_history,
        }
    }

    fn reverse_move(&mut self, reverse_move: Self::ReverseMove) {
        match reverse_move.previous_history {
            Some(history) => self.hash_history = history,
            None => {
                self.hash_history.pop();
            }
        }
        self.flip_side_to_move();
        let captured_piece = match self.to_move {
            Color::White => Piece::Black,
            Color::Black => Piece::White,
        };
        for square in reverse_move.captured {
            self.place(square, captured_piece);
        }
        self.move_piece(reverse_move.mv.to(), reverse_move.mv.from());
        self.result = reverse_move.previous_result;
    }

    fn game_result(&self) -> Option<GameResult> {
        self.result
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..BOARD_SIZE as u8 {
            write!(f, "{} ", y + 1)?;
            for x in 0..BOARD_SIZE as u8 {
                let square = Square::from_xy(x, y);
                let symbol = match self[square] {
                    Some(Piece::Black) => 'B',
                    Some(Piece::White) => 'W',
                    Some(Piece::King) => 'K',
                    None if square.is_throne() || square.is_camp() => '+',
                    None => '.',
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h i")?;
        match self.result {
            None => writeln!(f, "{:?} to move", self.to_move),
            Some(result) => writeln!(f, "Game over: {:?}", result),
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)?;
        writeln!(
            f,
            "Soldiers: {} white, {} black. Hash: {:x}",
            self.white_soldiers, self.black_soldiers, self.hash
        )
    }
}
