//! Conversion logic between DTOs and domain entities.

use lounge_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    BroadcastEvent, ChatMessage, LobbySnapshot, RoomName, RosterEntry, TopicEvent,
};
use crate::infrastructure::dto::{
    http::{HistoryEntryDto, RoomHistoryDto},
    websocket::{
        ChatFrame, LobbyFrame, OutboundFrame, PresenceNoticeFrame, RosterEntryFrame,
        RoomCountFrame,
    },
};

// ========================================
// Domain → WebSocket DTO
// ========================================

impl From<&RosterEntry> for RosterEntryFrame {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            id: entry.id.as_str().to_string(),
            username: entry.name.as_str().to_string(),
            image: entry.avatar.as_str().to_string(),
        }
    }
}

impl From<&LobbySnapshot> for LobbyFrame {
    fn from(snapshot: &LobbySnapshot) -> Self {
        Self {
            salas: snapshot
                .rooms
                .iter()
                .map(|room| RoomCountFrame {
                    name: room.name.as_str().to_string(),
                    users: room.member_count,
                })
                .collect(),
        }
    }
}

impl From<&BroadcastEvent> for OutboundFrame {
    fn from(event: &BroadcastEvent) -> Self {
        match event {
            BroadcastEvent::Chat {
                content,
                author_id,
                author_name,
                author_avatar,
            } => OutboundFrame::Chat(ChatFrame {
                message: content.as_str().to_string(),
                user_id: author_id.as_str().to_string(),
                user_name: author_name.as_str().to_string(),
                user_profile: author_avatar.as_str().to_string(),
            }),
            BroadcastEvent::Joined {
                announcement,
                roster,
            }
            | BroadcastEvent::Left {
                announcement,
                roster,
            } => OutboundFrame::Notice(PresenceNoticeFrame {
                entrou: announcement.clone(),
                num_users: roster.iter().map(RosterEntryFrame::from).collect(),
            }),
        }
    }
}

impl From<&TopicEvent> for OutboundFrame {
    fn from(event: &TopicEvent) -> Self {
        match event {
            TopicEvent::Room(event) => event.into(),
            TopicEvent::Lobby(snapshot) => OutboundFrame::Lobby(snapshot.into()),
        }
    }
}

// ========================================
// Domain → HTTP DTO
// ========================================

impl From<&ChatMessage> for HistoryEntryDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            content: message.content.as_str().to_string(),
            user_id: message.author.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(message.timestamp.value()),
        }
    }
}

impl RoomHistoryDto {
    pub fn new(room: &RoomName, messages: &[ChatMessage]) -> Self {
        Self {
            room: room.as_str().to_string(),
            messages: messages.iter().map(HistoryEntryDto::from).collect(),
        }
    }
}
