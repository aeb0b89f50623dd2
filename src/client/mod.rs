pub mod renderer;
pub mod view;
pub mod websocket_client;

pub use view::{ClientView, KeyOutcome};
pub use websocket_client::{play, ClientConfig};
