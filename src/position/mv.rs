use std::fmt;
use std::str::FromStr;

use crate::position::square::Square;

/// A rook-like move of a single piece.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Move {
    from: Square,
    to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        debug_assert!(from.x() == to.x() || from.y() == to.y());
        Move { from, to }
    }

    pub fn from(self) -> Square {
        self.from
    }

    pub fn to(self) -> Square {
        self.to
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = String;

    /// Parses moves written as `e4-e7`
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (from, to) = input
            .split_once('-')
            .ok_or_else(|| format!("Invalid move \"{}\"", input))?;
        let from: Square = from.trim().parse()?;
        let to: Square = to.trim().parse()?;
        if from == to || (from.x() != to.x() && from.y() != to.y()) {
            return Err(format!("Move \"{}\" is not along a line", input));
        }
        Ok(Move { from, to })
    }
}
