pub mod core;
pub mod client;
pub mod cli;

// Re-export for convenience
pub use crate::core::authority::{AuthorityError, Outbox, RoomAuthority};
pub use crate::core::protocol::{ClientMessage, RoomView, ServerMessage};
pub use crate::core::room::{ConnectionId, InvalidIntent, Role, Room, RoomId};
pub use crate::core::rules::{Square, Symbol};
