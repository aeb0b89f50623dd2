/// Room authority: the only owner of room state
///
/// Every intent is handled to completion (validate, mutate, notify) before the
/// next one. Notifications go out through an [`Outbox`], so the authority never
/// waits on a connection.
use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::protocol::{RoomView, ServerMessage};
use crate::core::room::{ConnectionId, InvalidIntent, Role, Room, RoomId};
use crate::core::rules::{Square, Symbol};

/// Delivery of one message to one connection, provided by the transport
pub trait Outbox {
    fn deliver(&mut self, to: ConnectionId, message: ServerMessage);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorityError {
    #[error("Room not found")]
    RoomNotFound(RoomId),
}

/// Where a connection ended up after create/join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seated {
    pub room_id: RoomId,
    pub symbol: Option<Symbol>,
}

/// What remained behind when a connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    pub role: Role,
    pub room_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Membership {
    role: Role,
}

#[derive(Debug)]
struct RoomEntry {
    room: Room,
    /// Join order.
    members: Vec<ConnectionId>,
}

impl RoomEntry {
    fn broadcast(&self, except: Option<ConnectionId>, message: &ServerMessage, out: &mut impl Outbox) {
        for &member in self.members.iter().filter(|&&m| Some(m) != except) {
            out.deliver(member, message.clone());
        }
    }

    fn broadcast_state(&self, out: &mut impl Outbox) {
        self.broadcast(None, &ServerMessage::State(RoomView::from(&self.room)), out);
    }
}

#[derive(Debug, Default)]
pub struct RoomAuthority {
    rooms: HashMap<RoomId, RoomEntry>,
    /// connection -> (room, role), filled on create/join, cleared on disconnect
    memberships: HashMap<ConnectionId, (RoomId, Membership)>,
}

impl RoomAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id).map(|entry| &entry.room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn members(&self, id: &RoomId) -> &[ConnectionId] {
        self.rooms.get(id).map(|entry| entry.members.as_slice()).unwrap_or_default()
    }

    pub fn membership(&self, conn: ConnectionId) -> Option<(&RoomId, Role)> {
        self.memberships.get(&conn).map(|(room_id, m)| (room_id, m.role))
    }

    fn unique_room_id(&self) -> RoomId {
        loop {
            let id = RoomId::generate();
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }

    /// Opens a new room with `conn` seated as X
    pub fn create(&mut self, conn: ConnectionId, out: &mut impl Outbox) -> Seated {
        self.leave_current_room(conn, out);

        let room_id = self.unique_room_id();
        let mut room = Room::new(room_id.clone());
        room.seats.x = Some(conn);

        self.rooms.insert(room_id.clone(), RoomEntry { room, members: vec![conn] });
        self.memberships.insert(conn, (room_id.clone(), Membership { role: Role::X }));
        info!(room = %room_id, conn = %conn, "room created");

        out.deliver(conn, ServerMessage::Created { room_id: room_id.clone(), symbol: Symbol::X });
        Seated { room_id, symbol: Some(Symbol::X) }
    }

    pub fn join(&mut self, conn: ConnectionId, room_id: &RoomId, out: &mut impl Outbox) -> Result<Seated, AuthorityError> {
        if !self.rooms.contains_key(room_id) {
            debug!(room = %room_id, conn = %conn, "join for unknown room");
            let err = AuthorityError::RoomNotFound(room_id.clone());
            out.deliver(conn, ServerMessage::Error(err.to_string()));
            return Err(err);
        }

        if let Some((current, membership)) = self.memberships.get(&conn) {
            if current == room_id {
                let symbol = membership.role.symbol();
                out.deliver(conn, ServerMessage::JoinAccepted { room_id: room_id.clone(), symbol });
                if let Some(entry) = self.rooms.get(room_id) {
                    out.deliver(conn, ServerMessage::State(RoomView::from(&entry.room)));
                }
                return Ok(Seated { room_id: room_id.clone(), symbol });
            }
        }
        self.leave_current_room(conn, out);

        // Leaving can only close the connection's previous room, never this one.
        let Some(entry) = self.rooms.get_mut(room_id) else {
            return Err(AuthorityError::RoomNotFound(room_id.clone()));
        };
        let role = entry.room.seat(conn);
        entry.members.push(conn);
        self.memberships.insert(conn, (room_id.clone(), Membership { role }));
        info!(room = %room_id, conn = %conn, %role, "joined room");

        out.deliver(conn, ServerMessage::JoinAccepted { room_id: room_id.clone(), symbol: role.symbol() });
        entry.broadcast(Some(conn), &ServerMessage::PlayerJoined { room_id: room_id.clone(), role }, out);
        entry.broadcast_state(out);

        Ok(Seated { room_id: room_id.clone(), symbol: role.symbol() })
    }

    /// Renames a seat; only its current holder may do so
    pub fn rename(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        symbol: Symbol,
        name: &str,
        out: &mut impl Outbox,
    ) -> Result<(), InvalidIntent> {
        let entry = self.rooms.get_mut(room_id).ok_or(InvalidIntent::RoomGone)?;
        entry.room.rename(conn, symbol, name)?;
        debug!(room = %room_id, %symbol, name = %entry.room.players.get(symbol), "seat renamed");
        entry.broadcast_state(out);
        Ok(())
    }

    pub fn make_move(
        &mut self,
        conn: ConnectionId,
        room_id: &RoomId,
        square: Square,
        out: &mut impl Outbox,
    ) -> Result<Symbol, InvalidIntent> {
        let entry = self.rooms.get_mut(room_id).ok_or(InvalidIntent::RoomGone)?;
        let symbol = entry.room.apply_move(conn, square)?;
        debug!(room = %room_id, %symbol, row = square.row, column = square.column, "move applied");
        if let Some(winner) = &entry.room.winner {
            info!(room = %room_id, %winner, "game won");
        } else if entry.room.is_draw() {
            info!(room = %room_id, "game drawn");
        }
        entry.broadcast_state(out);
        Ok(symbol)
    }

    /// Starts a new game in the room; names and seats carry over
    pub fn restart(&mut self, room_id: &RoomId, out: &mut impl Outbox) -> Result<(), InvalidIntent> {
        let entry = self.rooms.get_mut(room_id).ok_or(InvalidIntent::RoomGone)?;
        entry.room = entry.room.restarted();
        debug!(room = %room_id, "game restarted");
        entry.broadcast_state(out);
        Ok(())
    }

    /// Removes `conn` from its room, freeing its seat and closing the room if it was the last member
    pub fn disconnect(&mut self, conn: ConnectionId, out: &mut impl Outbox) -> Option<Departure> {
        let (room_id, membership) = self.memberships.remove(&conn)?;
        let entry = self.rooms.get_mut(&room_id)?;

        entry.members.retain(|&m| m != conn);
        let role = entry.room.vacate(conn).map_or(membership.role, Role::from);
        info!(room = %room_id, conn = %conn, %role, "left room");

        entry.broadcast(None, &ServerMessage::PlayerLeft { room_id: room_id.clone(), role }, out);

        let room_closed = entry.members.is_empty();
        if room_closed {
            self.rooms.remove(&room_id);
            info!(room = %room_id, "room closed");
        } else {
            entry.broadcast_state(out);
        }

        Some(Departure { room_id, role, room_closed })
    }

    fn leave_current_room(&mut self, conn: ConnectionId, out: &mut impl Outbox) {
        if self.memberships.contains_key(&conn) {
            self.disconnect(conn, out);
        }
    }
}
