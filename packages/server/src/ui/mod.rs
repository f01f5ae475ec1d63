//! WebSocket / HTTP server for the chat coordinator.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, router};
