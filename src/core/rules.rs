/// Tic-tac-toe rules: pure functions over a board, no state of their own
use std::fmt;

use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: usize = 3;
pub const MAX_TURNS: usize = BOARD_SIZE * BOARD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    pub fn other(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::X => "X",
            Symbol::O => "O",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per seat, serialized as `{"X": .., "O": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BySymbol<T> {
    #[serde(rename = "X")]
    pub x: T,
    #[serde(rename = "O")]
    pub o: T,
}

impl<T> BySymbol<T> {
    pub fn new(x: T, o: T) -> Self {
        Self { x, o }
    }

    pub fn get(&self, symbol: Symbol) -> &T {
        match symbol {
            Symbol::X => &self.x,
            Symbol::O => &self.o,
        }
    }

    pub fn get_mut(&mut self, symbol: Symbol) -> &mut T {
        match symbol {
            Symbol::X => &mut self.x,
            Symbol::O => &mut self.o,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> BySymbol<U> {
        BySymbol {
            x: f(&self.x),
            o: f(&self.o),
        }
    }
}

pub type Players = BySymbol<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: usize,
    pub column: usize,
}

impl Square {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    pub fn in_bounds(self) -> bool {
        self.row < BOARD_SIZE && self.column < BOARD_SIZE
    }
}

pub type Cell = Option<Symbol>;
pub type Board = [[Cell; BOARD_SIZE]; BOARD_SIZE];

pub fn empty_board() -> Board {
    [[None; BOARD_SIZE]; BOARD_SIZE]
}

/// Rows top-to-bottom, columns left-to-right, then both diagonals.
pub const WINNING_LINES: [[Square; 3]; 8] = [
    [Square::new(0, 0), Square::new(0, 1), Square::new(0, 2)],
    [Square::new(1, 0), Square::new(1, 1), Square::new(1, 2)],
    [Square::new(2, 0), Square::new(2, 1), Square::new(2, 2)],
    [Square::new(0, 0), Square::new(1, 0), Square::new(2, 0)],
    [Square::new(0, 1), Square::new(1, 1), Square::new(2, 1)],
    [Square::new(0, 2), Square::new(1, 2), Square::new(2, 2)],
    [Square::new(0, 0), Square::new(1, 1), Square::new(2, 2)],
    [Square::new(0, 2), Square::new(1, 1), Square::new(2, 0)],
];

/// First fully occupied line in scan order, with its owner
pub fn winning_line(board: &Board) -> Option<(Symbol, [Square; 3])> {
    WINNING_LINES.iter().find_map(|line| {
        let [a, b, c] = (*line).map(|sq| board[sq.row][sq.column]);
        match a {
            Some(symbol) if b == a && c == a => Some((symbol, *line)),
            _ => None,
        }
    })
}

pub fn winning_symbol(board: &Board) -> Option<Symbol> {
    winning_line(board).map(|(symbol, _)| symbol)
}

/// Display name of the player owning the first winning line, if any
pub fn compute_winner(board: &Board, players: &Players) -> Option<String> {
    winning_symbol(board).map(|symbol| players.get(symbol).clone())
}

pub fn is_draw(turns_count: usize, winner: Option<&str>) -> bool {
    turns_count == MAX_TURNS && winner.is_none()
}

pub fn filled_cells(board: &Board) -> usize {
    board.iter().flatten().filter(|cell| cell.is_some()).count()
}
