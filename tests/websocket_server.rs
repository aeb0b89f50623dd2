//! End-to-end: real server, real WebSocket clients.
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use tictacterm::core::protocol::{self, ClientMessage, ServerMessage};
use tictacterm::core::websocket::{RoomServer, ServerConfig};
use tictacterm::{Role, Symbol};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;
type TestResult = Result<(), Box<dyn std::error::Error>>;

async fn start_server(allowed_origins: Vec<String>) -> Result<String, Box<dyn std::error::Error>> {
    let server = RoomServer::bind(ServerConfig { addr: "127.0.0.1:0".into(), allowed_origins }).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.run());
    Ok(format!("ws://{addr}"))
}

async fn connect(url: &str) -> Result<Ws, Box<dyn std::error::Error>> {
    let (mut ws, _) = connect_async(url).await?;
    match recv(&mut ws).await? {
        ServerMessage::Welcome { name, .. } => assert_eq!(name, "tictacterm"),
        other => panic!("expected welcome, got {other:?}"),
    }
    Ok(ws)
}

async fn send(ws: &mut Ws, message: &ClientMessage) -> TestResult {
    ws.send(Message::Text(protocol::encode(message)?)).await?;
    Ok(())
}

async fn recv(ws: &mut Ws) -> Result<ServerMessage, Box<dyn std::error::Error>> {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await?
            .ok_or("connection closed")??;
        if let Message::Text(text) = frame {
            return Ok(protocol::decode_server(&text)?);
        }
    }
}

#[tokio::test]
async fn two_players_and_a_spectator_share_a_room() -> TestResult {
    let url = start_server(Vec::new()).await?;
    let mut host = connect(&url).await?;
    let mut guest = connect(&url).await?;
    let mut watcher = connect(&url).await?;

    send(&mut host, &ClientMessage::Create).await?;
    let room_id = match recv(&mut host).await? {
        ServerMessage::Created { room_id, symbol } => {
            assert_eq!(symbol, Symbol::X);
            room_id
        }
        other => panic!("expected created, got {other:?}"),
    };

    send(&mut guest, &ClientMessage::Join { room_id: room_id.clone() }).await?;
    assert_eq!(
        recv(&mut guest).await?,
        ServerMessage::JoinAccepted { room_id: room_id.clone(), symbol: Some(Symbol::O) }
    );
    assert!(matches!(recv(&mut guest).await?, ServerMessage::State(_)));
    assert_eq!(recv(&mut host).await?, ServerMessage::PlayerJoined { room_id: room_id.clone(), role: Role::O });
    assert!(matches!(recv(&mut host).await?, ServerMessage::State(view) if view.seats.o));

    send(&mut watcher, &ClientMessage::Join { room_id: room_id.clone() }).await?;
    assert_eq!(recv(&mut watcher).await?, ServerMessage::JoinAccepted { room_id: room_id.clone(), symbol: None });
    assert!(matches!(recv(&mut watcher).await?, ServerMessage::State(_)));
    for ws in [&mut host, &mut guest] {
        assert_eq!(recv(ws).await?, ServerMessage::PlayerJoined { room_id: room_id.clone(), role: Role::Spectator });
        assert!(matches!(recv(ws).await?, ServerMessage::State(_)));
    }

    // Whichever arrives first, O's intent is dropped (not its turn, or cell taken),
    // so every member sees exactly one state frame.
    send(&mut guest, &ClientMessage::Move { room_id: room_id.clone(), row: 1, column: 1 }).await?;
    send(&mut host, &ClientMessage::Move { room_id: room_id.clone(), row: 1, column: 1 }).await?;
    for ws in [&mut host, &mut guest, &mut watcher] {
        match recv(ws).await? {
            ServerMessage::State(view) => {
                assert_eq!(view.board[1][1], Some(Symbol::X));
                assert_eq!(view.active, Symbol::O);
                assert_eq!(view.turns.len(), 1);
            }
            other => panic!("expected state, got {other:?}"),
        }
    }

    host.close(None).await?;
    for ws in [&mut guest, &mut watcher] {
        assert_eq!(recv(ws).await?, ServerMessage::PlayerLeft { room_id: room_id.clone(), role: Role::X });
        match recv(ws).await? {
            ServerMessage::State(view) => {
                assert!(!view.seats.x);
                assert_eq!(view.active, Symbol::O);
            }
            other => panic!("expected state, got {other:?}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn unknown_room_is_reported_to_the_requester() -> TestResult {
    let url = start_server(Vec::new()).await?;
    let mut ws = connect(&url).await?;

    send(&mut ws, &ClientMessage::Join { room_id: "missing".into() }).await?;
    assert_eq!(recv(&mut ws).await?, ServerMessage::Error("Room not found".into()));

    // Garbage frames are ignored and the connection stays usable
    ws.send(Message::Text("{\"Teleport\":{}}".into())).await?;
    send(&mut ws, &ClientMessage::Create).await?;
    assert!(matches!(recv(&mut ws).await?, ServerMessage::Created { symbol: Symbol::X, .. }));
    Ok(())
}

#[tokio::test]
async fn disallowed_browser_origin_is_refused() -> TestResult {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;

    let url = start_server(vec!["http://localhost:5173".into()]).await?;

    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().insert("Origin", "http://evil.example".parse()?);
    assert!(connect_async(request).await.is_err());

    let mut request = url.as_str().into_client_request()?;
    request.headers_mut().insert("Origin", "http://localhost:5173".parse()?);
    let (_ws, _) = connect_async(request).await?;
    Ok(())
}
