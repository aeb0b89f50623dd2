/// WebSocket game client: connects, takes a seat and runs the terminal UI
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use ratatui::DefaultTerminal;
use tokio::net::TcpStream;
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::renderer;
use super::view::{ClientView, KeyOutcome};
use crate::core::protocol::{self, ClientMessage};
use crate::core::room::RoomId;

pub const DEFAULT_SERVER: &str = "127.0.0.1:3001";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub addr: String,
    /// Room to join; a new one is created when absent
    pub room: Option<RoomId>,
    pub name: Option<String>,
}

impl ClientConfig {
    pub fn url(&self) -> String {
        server_url(&self.addr)
    }

    /// First intent sent after connecting
    pub fn entry_intent(&self) -> ClientMessage {
        match &self.room {
            Some(room_id) => ClientMessage::Join { room_id: room_id.clone() },
            None => ClientMessage::Create,
        }
    }
}

pub fn server_url(addr: &str) -> String {
    if addr.starts_with("ws://") || addr.starts_with("wss://") {
        addr.to_string()
    } else {
        format!("ws://{addr}")
    }
}

pub async fn play(config: ClientConfig) -> Result<()> {
    let url = config.url();
    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    send(&mut ws_sender, &config.entry_intent()).await?;

    let mut view = ClientView::new(config.name);
    let mut terminal = ratatui::init();
    let result = run_loop(&mut terminal, &mut view, &mut ws_sender, &mut ws_receiver).await;
    ratatui::restore();

    let _ = ws_sender.close().await;
    result
}

async fn send(ws_sender: &mut SplitSink<WsStream, Message>, message: &ClientMessage) -> Result<()> {
    let json = protocol::encode(message)?;
    ws_sender.send(Message::Text(json)).await?;
    Ok(())
}

async fn run_loop(
    terminal: &mut DefaultTerminal,
    view: &mut ClientView,
    ws_sender: &mut SplitSink<WsStream, Message>,
    ws_receiver: &mut SplitStream<WsStream>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| renderer::render(frame, view))?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else { continue };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match view.on_key(key.code) {
                        KeyOutcome::Quit => return Ok(()),
                        KeyOutcome::Send(message) => send(ws_sender, &message).await?,
                        KeyOutcome::Nothing => {}
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        // Frames we cannot read are skipped rather than ending the session.
                        if let Ok(message) = protocol::decode_server(&text) {
                            if let Some(follow_up) = view.apply(message) {
                                send(ws_sender, &follow_up).await?;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Err(e)) => return Err(e).context("connection to server lost"),
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
