//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One persisted chat message in a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntryDto {
    pub content: String,
    pub user_id: String,
    /// RFC 3339 (UTC)
    pub timestamp: String,
}

/// A room's persisted chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomHistoryDto {
    pub room: String,
    pub messages: Vec<HistoryEntryDto>,
}
