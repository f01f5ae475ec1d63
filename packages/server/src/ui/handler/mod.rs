//! HTTP and WebSocket handlers.

mod http;
mod websocket;

pub use http::{debug_room_state, get_room_history, get_rooms, health_check};
pub use websocket::{lobby_websocket_handler, room_websocket_handler};
