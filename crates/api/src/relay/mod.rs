//! Hosted real-time relay
//!
//! WebSocket pub/sub grouping parties into rooms, where room identity equals
//! session identifier. The relay only broadcasts; persistence stays with the
//! senders and the REST surface.

pub mod connection;
pub mod events;
pub mod handler;
pub mod room;
pub mod state;

pub use connection::Connection;
pub use events::{ClientEvent, ServerEvent};
pub use handler::ws_handler;
pub use room::RoomManager;
pub use state::{RelayStats, WebSocketState};
