//! Wire format of the Tablut arbiter.
//!
//! Every message is a 4-byte big-endian length, followed by that many bytes of UTF-8 JSON. The client first sends its name as a JSON string, then receives the full game state after every move, and answers with a move whenever it is its turn.

use std::error;
use std::io::{self, Read, Write};

use board_game_traits::{Color, GameResult};
use serde::{Deserialize, Serialize};

use crate::position::{Move, Piece, Position, Square, BOARD_SIZE, NUM_SQUARES};

pub const WHITE_DEFAULT_PORT: u16 = 5800;
pub const BLACK_DEFAULT_PORT: u16 = 5801;

/// Upper bound on the size of a single message. Anything larger is a corrupt stream.
const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Cell {
    Empty,
    White,
    Black,
    King,
    Throne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Turn {
    White,
    Black,
    WhiteWin,
    BlackWin,
    Draw,
}

impl Turn {
    pub fn side_to_move(self) -> Option<Color> {
        match self {
            Turn::White => Some(Color::White),
            Turn::Black => Some(Color::Black),
            _ => None,
        }
    }

    pub fn game_result(self) -> Option<GameResult> {
        match self {
            Turn::WhiteWin => Some(GameResult::WhiteWin),
            Turn::BlackWin => Some(GameResult::BlackWin),
            Turn::Draw => Some(GameResult::Draw),
            Turn::White | Turn::Black => None,
        }
    }
}

impl From<Color> for Turn {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Turn::White,
            Color::Black => Turn::Black,
        }
    }
}

/// The game state, as sent by the arbiter. `board[y][x]`, with row 0 first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMessage {
    pub board: Vec<Vec<Cell>>,
    pub turn: Turn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    pub from: String,
    pub to: String,
    pub turn: Turn,
}

impl StateMessage {
    /// Converts the message to a position with an empty repetition history.
    ///
    /// Once the game is over, the side to move is irrelevant and set to white.
    pub fn to_position(&self) -> Result<Position, String> {
        if self.board.len() != BOARD_SIZE || self.board.iter().any(|row| row.len() != BOARD_SIZE) {
            return Err(format!(
                "Expected a {}x{} board, got {} rows",
                BOARD_SIZE,
                BOARD_SIZE,
                self.board.len()
            ));
        }
        let mut cells = [None; NUM_SQUARES];
        for (y, row) in self.board.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let square = Square::from_xy(x as u8, y as u8);
                cells[square.into_inner() as usize] = match cell {
                    Cell::Empty | Cell::Throne => None,
                    Cell::White => Some(Piece::White),
                    Cell::Black => Some(Piece::Black),
                    Cell::King => Some(Piece::King),
                };
            }
        }
        let to_move = self.turn.side_to_move().unwrap_or(Color::White);
        Position::from_cells(cells, to_move, self.turn.game_result())
            .ok_or_else(|| "Board must have exactly one king".to_string())
    }

    pub fn from_position(position: &Position) -> Self {
        use board_game_traits::Position as PositionTrait;

        let board = (0..BOARD_SIZE as u8)
            .map(|y| {
                (0..BOARD_SIZE as u8)
                    .map(|x| {
                        let square = Square::from_xy(x, y);
                        match position[square] {
                            Some(Piece::White) => Cell::White,
                            Some(Piece::Black) => Cell::Black,
                            Some(Piece::King) => Cell::King,
                            None if square.is_throne() => Cell::Throne,
                            None => Cell::Empty,
                        }
                    })
                    .collect()
            })
            .collect();
        let turn = match position.game_result() {
            Some(GameResult::WhiteWin) => Turn::WhiteWin,
            Some(GameResult::BlackWin) => Turn::BlackWin,
            Some(GameResult::Draw) => Turn::Draw,
            None => position.side_to_move().into(),
        };
        StateMessage { board, turn }
    }
}

impl MoveMessage {
    pub fn new(mv: Move, color: Color) -> Self {
        MoveMessage {
            from: mv.from().to_string(),
            to: mv.to().to_string(),
            turn: color.into(),
        }
    }

    pub fn to_move(&self) -> Result<Move, String> {
        format!("{}-{}", self.from, self.to).parse()
    }
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &str) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Message too long"))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload.as_bytes())?;
    writer.flush()
}

/// Reads one message. Returns `None` if the stream was closed cleanly before a new message started.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<String>> {
    let mut len_bytes = [0; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => (),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message of {} bytes is too long", len),
        ));
    }
    let mut payload = vec![0; len];
    reader.read_exact(&mut payload)?;
    String::from_utf8(payload)
        .map(Some)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn send_name<W: Write>(writer: &mut W, name: &str) -> Result<(), Box<dyn error::Error>> {
    write_frame(writer, &serde_json::to_string(name)?)?;
    Ok(())
}

pub fn send_move<W: Write>(writer: &mut W, mv: Move, color: Color) -> Result<(), Box<dyn error::Error>> {
    write_frame(writer, &serde_json::to_string(&MoveMessage::new(mv, color))?)?;
    Ok(())
}

pub fn parse_state(json: &str) -> Result<StateMessage, Box<dyn error::Error>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads the next state from the arbiter, or `None` if it closed the connection.
pub fn read_state<R: Read>(reader: &mut R) -> Result<Option<StateMessage>, Box<dyn error::Error>> {
    match read_frame(reader)? {
        Some(json) => Ok(Some(parse_state(&json)?)),
        None => Ok(None),
    }
}
