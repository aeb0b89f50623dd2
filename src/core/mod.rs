pub mod rules;
pub mod room;
pub mod authority;
pub mod protocol;

// WebSocket transport feeding the authority
pub mod websocket;
