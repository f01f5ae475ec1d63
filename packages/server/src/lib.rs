//! Lounge chat server library.
//!
//! Room presence and broadcast coordinator: connections join named rooms over
//! WebSocket, receive live rosters and chat fan-out, and a lobby feed reports
//! every room with its member count.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
