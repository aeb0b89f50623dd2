/// Room state: one independent game, its seats and its move log
use std::fmt;

use serde::{Deserialize, Serialize};
use rand::distr::{Alphanumeric, SampleString};

use crate::core::rules::{self, Board, BySymbol, Players, Square, Symbol};

pub const MAX_NAME_LEN: usize = 20;
pub const ROOM_ID_LEN: usize = 8;
pub const DEFAULT_NAMES: [&str; 2] = ["Player 1", "Player 2"];

/// Identity of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Random alphanumeric id; callers check it against live rooms
    pub fn generate() -> Self {
        Self(Alphanumeric.sample_string(&mut rand::rng(), ROOM_ID_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a member of a room may do there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    X,
    O,
    #[serde(rename = "spectator")]
    Spectator,
}

impl Role {
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Role::X => Some(Symbol::X),
            Role::O => Some(Symbol::O),
            Role::Spectator => None,
        }
    }
}

impl From<Symbol> for Role {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => Role::X,
            Symbol::O => Role::O,
        }
    }
}

impl From<Option<Symbol>> for Role {
    fn from(symbol: Option<Symbol>) -> Self {
        symbol.map_or(Role::Spectator, Role::from)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::X => f.write_str("X"),
            Role::O => f.write_str("O"),
            Role::Spectator => f.write_str("spectator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub player: Symbol,
    pub square: Square,
}

/// Why an intent was dropped without touching the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIntent {
    #[error("room does not exist")]
    RoomGone,
    #[error("game already has a winner")]
    GameOver,
    #[error("connection does not hold the active seat")]
    NotYourTurn,
    #[error("connection does not hold that seat")]
    NotSeatOwner,
    #[error("square is outside the board")]
    OutOfBounds,
    #[error("square is already taken")]
    CellOccupied,
}

pub type Seats = BySymbol<Option<ConnectionId>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub board: Board,
    /// Most recent first.
    pub turns: Vec<Turn>,
    pub players: Players,
    pub active: Symbol,
    pub winner: Option<String>,
    pub seats: Seats,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            board: rules::empty_board(),
            turns: Vec::new(),
            players: BySymbol::new(DEFAULT_NAMES[0].to_string(), DEFAULT_NAMES[1].to_string()),
            active: Symbol::X,
            winner: None,
            seats: BySymbol::default(),
        }
    }

    /// A fresh game in the same room, keeping names and seat holders
    pub fn restarted(&self) -> Self {
        Self {
            players: self.players.clone(),
            seats: self.seats,
            ..Self::new(self.id.clone())
        }
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<Symbol> {
        [Symbol::X, Symbol::O]
            .into_iter()
            .find(|&symbol| *self.seats.get(symbol) == Some(conn))
    }

    /// Seat a newcomer would take: O first, then X if its holder left
    pub fn open_seat(&self) -> Option<Symbol> {
        [Symbol::O, Symbol::X]
            .into_iter()
            .find(|&symbol| self.seats.get(symbol).is_none())
    }

    /// Seats `conn` on the open seat, or leaves it spectating
    pub fn seat(&mut self, conn: ConnectionId) -> Role {
        match self.open_seat() {
            Some(symbol) => {
                *self.seats.get_mut(symbol) = Some(conn);
                Role::from(symbol)
            }
            None => Role::Spectator,
        }
    }

    pub fn check_rename(&self, conn: ConnectionId, symbol: Symbol) -> Result<(), InvalidIntent> {
        if *self.seats.get(symbol) != Some(conn) {
            return Err(InvalidIntent::NotSeatOwner);
        }
        Ok(())
    }

    pub fn rename(&mut self, conn: ConnectionId, symbol: Symbol, name: &str) -> Result<(), InvalidIntent> {
        self.check_rename(conn, symbol)?;
        *self.players.get_mut(symbol) = name.chars().take(MAX_NAME_LEN).collect();
        Ok(())
    }

    /// Symbol `conn` would place at `square`, if the move is legal now
    pub fn check_move(&self, conn: ConnectionId, square: Square) -> Result<Symbol, InvalidIntent> {
        if self.winner.is_some() {
            return Err(InvalidIntent::GameOver);
        }
        if *self.seats.get(self.active) != Some(conn) {
            return Err(InvalidIntent::NotYourTurn);
        }
        if !square.in_bounds() {
            return Err(InvalidIntent::OutOfBounds);
        }
        if self.board[square.row][square.column].is_some() {
            return Err(InvalidIntent::CellOccupied);
        }
        Ok(self.active)
    }

    pub fn apply_move(&mut self, conn: ConnectionId, square: Square) -> Result<Symbol, InvalidIntent> {
        let symbol = self.check_move(conn, square)?;

        self.board[square.row][square.column] = Some(symbol);
        self.turns.insert(0, Turn { player: symbol, square });
        self.winner = rules::compute_winner(&self.board, &self.players);

        // Nothing left to play after a win, so the turn stays put.
        if self.winner.is_none() {
            self.active = symbol.other();
        }
        Ok(symbol)
    }

    /// Frees the seat held by `conn`, passing the turn on if it was active
    pub fn vacate(&mut self, conn: ConnectionId) -> Option<Symbol> {
        let symbol = self.seat_of(conn)?;
        *self.seats.get_mut(symbol) = None;
        if self.active == symbol {
            self.active = symbol.other();
        }
        Some(symbol)
    }

    pub fn is_draw(&self) -> bool {
        rules::is_draw(self.turns.len(), self.winner.as_deref())
    }
}
