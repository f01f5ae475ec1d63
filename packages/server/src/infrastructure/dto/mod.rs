//! Data Transfer Objects (DTOs) for the Lounge wire protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: room and lobby channel frames
//! - `http`: HTTP API response DTOs
//! - `conversion`: domain ↔ DTO conversions

pub mod conversion;
pub mod http;
pub mod websocket;
