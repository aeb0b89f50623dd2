use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::{self, ClientConfig};
use crate::client::websocket_client::DEFAULT_SERVER;
use crate::core::room::RoomId;
use crate::core::websocket::{RoomServer, ServerConfig, DEFAULT_ADDR};

#[derive(Parser)]
#[command(name = "tictacterm")]
#[command(about = "Online tic-tac-toe rooms for two players and any number of spectators")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the room server
    Serve {
        /// Address to bind the server to
        #[arg(short, long, env = "TICTACTERM_ADDR", default_value = DEFAULT_ADDR)]
        addr: String,

        /// Browser origin allowed to connect (repeatable; none means any)
        #[arg(long = "allow-origin", env = "TICTACTERM_ALLOW_ORIGINS", value_delimiter = ',')]
        allow_origins: Vec<String>,
    },
    /// Create or join a room and play in the terminal
    Play {
        /// Server address (host:port or ws:// URL)
        #[arg(default_value = DEFAULT_SERVER)]
        addr: String,

        /// Room id to join; a new room is created when omitted
        #[arg(short, long)]
        room: Option<String>,

        /// Display name for your seat
        #[arg(short, long)]
        name: Option<String>,
    },
}

impl Commands {
    fn into_action(self) -> Action {
        match self {
            Commands::Serve { addr, allow_origins } => Action::Serve(ServerConfig {
                addr,
                allowed_origins: allow_origins.into_iter().filter(|o| !o.trim().is_empty()).collect(),
            }),
            Commands::Play { addr, room, name } => Action::Play(ClientConfig {
                addr,
                room: room.filter(|r| !r.trim().is_empty()).map(RoomId::from),
                name,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Serve(ServerConfig),
    Play(ClientConfig),
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let action = match cli.command {
        Some(command) => command.into_action(),
        None => match show_main_menu()? {
            Some(action) => action,
            None => {
                println!("Goodbye!");
                return Ok(());
            }
        },
    };

    match action {
        Action::Serve(config) => serve(config).await,
        Action::Play(config) => client::play(config).await,
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn serve(config: ServerConfig) -> Result<()> {
    init_tracing();
    let server = RoomServer::bind(config).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

fn show_main_menu() -> Result<Option<Action>> {
    println!("Tic-tac-toe online");
    println!();

    let options = ["Create a room", "Join a room", "Run a server", "Exit"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What would you like to do?")
        .items(&options)
        .default(0)
        .interact()?;

    let action = match selection {
        0 | 1 => {
            let addr: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Server address")
                .default(DEFAULT_SERVER.to_string())
                .interact_text()?;
            let room = if selection == 1 {
                let id: String = Input::with_theme(&ColorfulTheme::default())
                    .with_prompt("Room id")
                    .interact_text()?;
                Some(RoomId::from(id.trim()))
            } else {
                None
            };
            let name: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Your name (empty keeps the default)")
                .allow_empty(true)
                .interact_text()?;
            Some(Action::Play(ClientConfig { addr, room, name: Some(name) }))
        }
        2 => {
            let addr: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Bind address")
                .default(DEFAULT_ADDR.to_string())
                .interact_text()?;
            Some(Action::Serve(ServerConfig { addr, ..ServerConfig::default() }))
        }
        _ => None,
    };

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Action {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.command.unwrap().into_action()
    }

    #[test]
    fn serve_defaults_and_origins() {
        assert_eq!(
            parse(&["tictacterm", "serve", "--addr", "127.0.0.1:9000"]),
            Action::Serve(ServerConfig { addr: "127.0.0.1:9000".into(), allowed_origins: vec![] })
        );
        assert_eq!(
            parse(&["tictacterm", "serve", "--addr", "0.0.0.0:1", "--allow-origin", "http://a,http://b"]),
            Action::Serve(ServerConfig {
                addr: "0.0.0.0:1".into(),
                allowed_origins: vec!["http://a".into(), "http://b".into()],
            })
        );
    }

    #[test]
    fn play_with_room_and_name() {
        assert_eq!(
            parse(&["tictacterm", "play", "10.0.0.2:3001", "--room", "abc", "--name", "Ada"]),
            Action::Play(ClientConfig {
                addr: "10.0.0.2:3001".into(),
                room: Some(RoomId::from("abc")),
                name: Some("Ada".into()),
            })
        );
        assert_eq!(
            parse(&["tictacterm", "play"]),
            Action::Play(ClientConfig { addr: DEFAULT_SERVER.into(), room: None, name: None })
        );
    }
}
