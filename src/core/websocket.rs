/// WebSocket transport for the room authority
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::handshake::server::{ErrorResponse, Request, Response},
    tungstenite::http::StatusCode,
    tungstenite::protocol::Message,
};
use tracing::{debug, info, warn};

use crate::core::authority::{Outbox, RoomAuthority};
use crate::core::protocol::{self, ClientMessage, ServerMessage};
use crate::core::room::ConnectionId;
use crate::core::rules::Square;

pub const SERVER_NAME: &str = "tictacterm";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    /// Browser origins allowed to connect; empty allows any
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Transport events, consumed in arrival order by the authority task
#[derive(Debug)]
enum Event {
    Connected { id: ConnectionId, sender: mpsc::UnboundedSender<ServerMessage> },
    Intent { id: ConnectionId, message: ClientMessage },
    Disconnected { id: ConnectionId },
}

/// Outbound queues of every live connection
#[derive(Debug, Default)]
struct Sessions {
    senders: HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
}

impl Outbox for Sessions {
    fn deliver(&mut self, to: ConnectionId, message: ServerMessage) {
        if let Some(sender) = self.senders.get(&to) {
            // A closed queue means the connection is already going away.
            let _ = sender.send(message);
        }
    }
}

pub struct RoomServer {
    listener: TcpListener,
    allowed_origins: Arc<Vec<String>>,
}

impl RoomServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .with_context(|| format!("failed to bind {}", config.addr))?;
        Ok(Self {
            listener,
            allowed_origins: Arc::new(config.allowed_origins),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the listener fails
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr()?, "room server listening");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_authority(events_rx));

        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!(%addr, "new tcp connection");
            tokio::spawn(handle_connection(
                stream,
                addr,
                events_tx.clone(),
                Arc::clone(&self.allowed_origins),
            ));
        }
    }
}

async fn run_authority(mut events: mpsc::UnboundedReceiver<Event>) {
    let mut authority = RoomAuthority::new();
    let mut sessions = Sessions::default();

    while let Some(event) = events.recv().await {
        match event {
            Event::Connected { id, sender } => {
                sessions.senders.insert(id, sender);
            }
            Event::Intent { id, message } => dispatch(&mut authority, &mut sessions, id, message),
            Event::Disconnected { id } => {
                sessions.senders.remove(&id);
                authority.disconnect(id, &mut sessions);
            }
        }
    }
}

fn dispatch(authority: &mut RoomAuthority, sessions: &mut Sessions, id: ConnectionId, message: ClientMessage) {
    let rejected = match message {
        ClientMessage::Create => {
            authority.create(id, sessions);
            None
        }
        ClientMessage::Join { room_id } => {
            if let Err(err) = authority.join(id, &room_id, sessions) {
                debug!(conn = %id, room = %room_id, %err, "join refused");
            }
            None
        }
        ClientMessage::Rename { room_id, symbol, name } => {
            authority.rename(id, &room_id, symbol, &name, sessions).err()
        }
        ClientMessage::Move { room_id, row, column } => {
            authority.make_move(id, &room_id, Square::new(row, column), sessions).err()
        }
        ClientMessage::Restart { room_id } => authority.restart(&room_id, sessions).err(),
    };

    if let Some(reason) = rejected {
        debug!(conn = %id, %reason, "intent dropped");
    }
}

fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    match origin {
        // Only browsers send Origin; other clients are not subject to the list.
        None => true,
        Some(origin) => allowed.is_empty() || allowed.iter().any(|a| a == origin),
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<Event>,
    allowed_origins: Arc<Vec<String>>,
) {
    let check_origin = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let origin = request.headers().get("origin").and_then(|v| v.to_str().ok());
        if origin_allowed(&allowed_origins, origin) {
            return Ok(response);
        }
        warn!(%addr, origin = origin.unwrap_or_default(), "origin refused");
        let mut refusal = ErrorResponse::new(Some("origin not allowed".to_string()));
        *refusal.status_mut() = StatusCode::FORBIDDEN;
        Err(refusal)
    };

    let ws_stream = match accept_hdr_async(stream, check_origin).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(%addr, error = %e, "websocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let id = ConnectionId::random();
    let (sender, mut outgoing) = mpsc::unbounded_channel::<ServerMessage>();
    info!(conn = %id, %addr, "client connected");

    let welcome = ServerMessage::Welcome {
        name: SERVER_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connection_id: id,
    };
    let _ = sender.send(welcome);
    if events.send(Event::Connected { id, sender }).is_err() {
        return;
    }

    let sender_task = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let json = match protocol::encode(&message) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to encode server message");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match protocol::decode_client(&text) {
                Ok(message) => {
                    if events.send(Event::Intent { id, message }).is_err() {
                        break;
                    }
                }
                Err(e) => debug!(conn = %id, error = %e, "undecodable frame dropped"),
            },
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(conn = %id, error = %e, "websocket error");
                break;
            }
            _ => {}
        }
    }

    info!(conn = %id, "client disconnected");
    let _ = events.send(Event::Disconnected { id });
    sender_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_rules() {
        let allowed = vec!["http://localhost:5173".to_string()];
        assert!(origin_allowed(&[], Some("http://evil.example")));
        assert!(origin_allowed(&allowed, None));
        assert!(origin_allowed(&allowed, Some("http://localhost:5173")));
        assert!(!origin_allowed(&allowed, Some("http://evil.example")));
    }

    #[test]
    fn sessions_ignore_unknown_and_closed_connections() {
        let mut sessions = Sessions::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::random();
        sessions.senders.insert(id, tx);
        drop(rx);

        sessions.deliver(id, ServerMessage::Error("x".into()));
        sessions.deliver(ConnectionId::random(), ServerMessage::Error("y".into()));
    }
}
