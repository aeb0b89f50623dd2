/// Wire messages between the room server and its clients
use serde::{Deserialize, Serialize};

use crate::core::rules::{Board, BySymbol, Players, Square, Symbol};
use crate::core::room::{ConnectionId, Role, Room, RoomId, Turn};

/// Intents a client sends to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    Create,
    Join { room_id: RoomId },
    Rename { room_id: RoomId, symbol: Symbol, name: String },
    Move { room_id: RoomId, row: usize, column: usize },
    Restart { room_id: RoomId },
}

/// Everything the server pushes to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Sent first on every connection
    Welcome { name: String, version: String, connection_id: ConnectionId },
    Created { room_id: RoomId, symbol: Symbol },
    JoinAccepted { room_id: RoomId, symbol: Option<Symbol> },
    Error(String),
    PlayerJoined { room_id: RoomId, role: Role },
    PlayerLeft { room_id: RoomId, role: Role },
    State(RoomView),
}

/// Room snapshot as broadcast to members, with seat holders reduced to flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    pub id: RoomId,
    pub board: Board,
    pub turns: Vec<Turn>,
    pub players: Players,
    pub active: Symbol,
    pub winner: Option<String>,
    pub seats: BySymbol<bool>,
    pub draw: bool,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            board: room.board,
            turns: room.turns.clone(),
            players: room.players.clone(),
            active: room.active,
            winner: room.winner.clone(),
            seats: room.seats.map(Option::is_some),
            draw: room.is_draw(),
        }
    }
}

impl RoomView {
    pub fn cell(&self, square: Square) -> Option<Symbol> {
        self.board[square.row][square.column]
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.draw
    }
}

pub fn encode<T: Serialize>(message: &T) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

pub fn decode_client(text: &str) -> serde_json::Result<ClientMessage> {
    serde_json::from_str(text)
}

pub fn decode_server(text: &str) -> serde_json::Result<ServerMessage> {
    serde_json::from_str(text)
}
