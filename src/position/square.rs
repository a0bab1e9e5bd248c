use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use Direction::*;

pub const BOARD_SIZE: usize = 9;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

/// One of the four cardinal directions on the board. North is towards row 1.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    North = 0,
    West = 1,
    East = 2,
    South = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [North, West, East, South];

    pub fn reverse(self) -> Direction {
        match self {
            North => South,
            West => East,
            East => West,
            South => North,
        }
    }
}

/// The four groups of camp squares, named by the edge they sit on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Camp {
    North,
    West,
    East,
    South,
}

#[rustfmt::skip]
const CAMPS_MASK: [[bool; BOARD_SIZE]; BOARD_SIZE] = [
    [false, false, false, true,  true,  true,  false, false, false],
    [false, false, false, false, true,  false, false, false, false],
    [false, false, false, false, false, false, false, false, false],
    [true,  false, false, false, false, false, false, false, true ],
    [true,  true,  false, false, false, false, false, true,  true ],
    [true,  false, false, false, false, false, false, false, true ],
    [false, false, false, false, false, false, false, false, false],
    [false, false, false, false, true,  false, false, false, false],
    [false, false, false, true,  true,  true,  false, false, false],
];

/// A location on the board. Can be used to index a `Position`.
///
/// `x` is the column, written as a letter from `a` to `i`, and `y` is the row, written as a number from 1 to 9.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Square {
    inner: u8,
}

impl Square {
    pub const THRONE: Square = Square::from_xy(4, 4);

    pub const fn from_u8(inner: u8) -> Self {
        assert!((inner as usize) < NUM_SQUARES);
        Square { inner }
    }

    pub const fn from_xy(x: u8, y: u8) -> Self {
        assert!((x as usize) < BOARD_SIZE && (y as usize) < BOARD_SIZE);
        Square {
            inner: y * BOARD_SIZE as u8 + x,
        }
    }

    pub const fn into_inner(self) -> u8 {
        self.inner
    }

    pub const fn x(self) -> u8 {
        self.inner % BOARD_SIZE as u8
    }

    pub const fn y(self) -> u8 {
        self.inner / BOARD_SIZE as u8
    }

    pub fn squares_iterator() -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES as u8).map(Square::from_u8)
    }

    pub const fn go_direction(self, direction: Direction) -> Option<Self> {
        let x = self.x();
        let y = self.y();
        match direction {
            North => {
                if y == 0 {
                    None
                } else {
                    Some(Square::from_xy(x, y - 1))
                }
            }
            West => {
                if x == 0 {
                    None
                } else {
                    Some(Square::from_xy(x - 1, y))
                }
            }
            East => {
                if x + 1 >= BOARD_SIZE as u8 {
                    None
                } else {
                    Some(Square::from_xy(x + 1, y))
                }
            }
            South => {
                if y + 1 >= BOARD_SIZE as u8 {
                    None
                } else {
                    Some(Square::from_xy(x, y + 1))
                }
            }
        }
    }

    pub fn neighbours(self) -> impl Iterator<Item = Square> {
        Direction::ALL
            .into_iter()
            .filter_map(move |direction| self.go_direction(direction))
    }

    pub const fn is_throne(self) -> bool {
        self.inner == Self::THRONE.inner
    }

    pub const fn is_camp(self) -> bool {
        CAMPS_MASK[self.y() as usize][self.x() as usize]
    }

    pub const fn camp(self) -> Option<Camp> {
        if !self.is_camp() {
            None
        } else if self.y() <= 1 {
            Some(Camp::North)
        } else if self.y() >= 7 {
            Some(Camp::South)
        } else if self.x() <= 1 {
            Some(Camp::West)
        } else {
            Some(Camp::East)
        }
    }

    pub const fn is_edge(self) -> bool {
        self.x() == 0
            || self.y() == 0
            || self.x() == BOARD_SIZE as u8 - 1
            || self.y() == BOARD_SIZE as u8 - 1
    }

    pub fn is_next_to_throne(self) -> bool {
        self.neighbours().any(Square::is_throne)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.x()) as char, self.y() + 1)
    }
}

impl FromStr for Square {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut chars = input.chars();
        let (Some(column), Some(row), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(format!("Invalid square \"{}\"", input));
        };
        let column = column.to_ascii_lowercase();
        if !('a'..='i').contains(&column) || !('1'..='9').contains(&row) {
            return Err(format!("Invalid square \"{}\"", input));
        }
        Ok(Square::from_xy(column as u8 - b'a', row as u8 - b'1'))
    }
}
