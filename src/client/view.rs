/// Client-side view of a room: folds server messages and key presses into UI state
use crossterm::event::KeyCode;

use crate::core::protocol::{ClientMessage, RoomView, ServerMessage};
use crate::core::room::{ConnectionId, Role, RoomId, MAX_NAME_LEN};
use crate::core::rules::{Square, Symbol, BOARD_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Send(ClientMessage),
    Quit,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ClientView {
    pub connection_id: Option<ConnectionId>,
    pub room_id: Option<RoomId>,
    pub symbol: Option<Symbol>,
    pub room: Option<RoomView>,
    pub cursor: Square,
    /// Name being typed while editing the own seat's name
    pub editing: Option<String>,
    pub notice: Option<String>,
    pending_name: Option<String>,
}

impl ClientView {
    /// `name` is sent as a rename once the server has seated us
    pub fn new(name: Option<String>) -> Self {
        Self {
            connection_id: None,
            room_id: None,
            symbol: None,
            room: None,
            cursor: Square::new(1, 1),
            editing: None,
            notice: None,
            pending_name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    pub fn role(&self) -> Role {
        Role::from(self.symbol)
    }

    pub fn is_my_turn(&self) -> bool {
        match (&self.room, self.symbol) {
            (Some(room), Some(symbol)) => room.active == symbol && !room.is_over(),
            _ => false,
        }
    }

    /// Folds in one server message; may answer with a follow-up intent
    pub fn apply(&mut self, message: ServerMessage) -> Option<ClientMessage> {
        match message {
            ServerMessage::Welcome { name, version, connection_id } => {
                self.connection_id = Some(connection_id);
                self.notice = Some(format!("Connected to {name} v{version}"));
                None
            }
            ServerMessage::Created { room_id, symbol } => {
                self.notice = Some(format!("Room created, share the id: {room_id}"));
                self.seated(room_id, Some(symbol))
            }
            ServerMessage::JoinAccepted { room_id, symbol } => {
                self.notice = Some(format!("Joined as {}", Role::from(symbol)));
                self.seated(room_id, symbol)
            }
            ServerMessage::Error(error) => {
                self.notice = Some(error);
                None
            }
            ServerMessage::PlayerJoined { role, .. } => {
                self.notice = Some(match role {
                    Role::Spectator => "A spectator joined".to_string(),
                    seat => format!("A player took seat {seat}"),
                });
                None
            }
            ServerMessage::PlayerLeft { role, .. } => {
                self.notice = Some(match role {
                    Role::Spectator => "A spectator left".to_string(),
                    seat => format!("The player on seat {seat} left"),
                });
                None
            }
            ServerMessage::State(room) => {
                self.room = Some(room);
                None
            }
        }
    }

    fn seated(&mut self, room_id: RoomId, symbol: Option<Symbol>) -> Option<ClientMessage> {
        self.room_id = Some(room_id.clone());
        self.symbol = symbol;
        let symbol = symbol?;
        let name = self.pending_name.take()?;
        Some(ClientMessage::Rename { room_id, symbol, name })
    }

    pub fn on_key(&mut self, code: KeyCode) -> KeyOutcome {
        if self.editing.is_some() {
            return self.on_edit_key(code);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => KeyOutcome::Quit,
            KeyCode::Up => {
                self.cursor.row = self.cursor.row.saturating_sub(1);
                KeyOutcome::Nothing
            }
            KeyCode::Down => {
                self.cursor.row = (self.cursor.row + 1).min(BOARD_SIZE - 1);
                KeyOutcome::Nothing
            }
            KeyCode::Left => {
                self.cursor.column = self.cursor.column.saturating_sub(1);
                KeyOutcome::Nothing
            }
            KeyCode::Right => {
                self.cursor.column = (self.cursor.column + 1).min(BOARD_SIZE - 1);
                KeyOutcome::Nothing
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.place(),
            KeyCode::Char('r') => match (&self.room_id, &self.room) {
                (Some(room_id), Some(room)) if room.is_over() => {
                    KeyOutcome::Send(ClientMessage::Restart { room_id: room_id.clone() })
                }
                _ => KeyOutcome::Nothing,
            },
            KeyCode::Char('e') => {
                if let Some(symbol) = self.symbol {
                    let current = self.room.as_ref().map(|r| r.players.get(symbol).clone());
                    self.editing = Some(current.unwrap_or_default());
                }
                KeyOutcome::Nothing
            }
            _ => KeyOutcome::Nothing,
        }
    }

    fn place(&self) -> KeyOutcome {
        if !self.is_my_turn() {
            return KeyOutcome::Nothing;
        }
        match (&self.room_id, &self.room) {
            (Some(room_id), Some(room)) if room.cell(self.cursor).is_none() => KeyOutcome::Send(ClientMessage::Move {
                room_id: room_id.clone(),
                row: self.cursor.row,
                column: self.cursor.column,
            }),
            _ => KeyOutcome::Nothing,
        }
    }

    fn on_edit_key(&mut self, code: KeyCode) -> KeyOutcome {
        let Some(buffer) = self.editing.as_mut() else {
            return KeyOutcome::Nothing;
        };
        match code {
            KeyCode::Char(c) if buffer.chars().count() < MAX_NAME_LEN => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Esc => self.editing = None,
            KeyCode::Enter => {
                let name = self.editing.take().unwrap_or_default();
                if let (Some(room_id), Some(symbol)) = (&self.room_id, self.symbol) {
                    return KeyOutcome::Send(ClientMessage::Rename { room_id: room_id.clone(), symbol, name });
                }
            }
            _ => {}
        }
        KeyOutcome::Nothing
    }

    pub fn status(&self) -> String {
        let Some(room_id) = &self.room_id else {
            return "Connecting...".to_string();
        };
        let Some(room) = &self.room else {
            return format!("Waiting for an opponent. Invite: tictacterm play --room {room_id}");
        };
        if let Some(winner) = &room.winner {
            return format!("{winner} won! Press r to play again");
        }
        if room.draw {
            return "Draw! Press r to play again".to_string();
        }
        let active_name = room.players.get(room.active);
        match self.symbol {
            None => format!("Spectating, {active_name} to move"),
            Some(_) if self.is_my_turn() => "Your turn".to_string(),
            Some(_) => format!("Waiting for {active_name}"),
        }
    }
}
