//! Events carried over broadcast topics.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;

use super::{
    entity::{RosterEntry, RoomSummary},
    value_object::{AvatarRef, DisplayName, MessageContent, RoomName, UserId},
};

/// A fan-out target: one per room, plus the single lobby feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Room(RoomName),
    Lobby,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Room(name) => write!(f, "chat_{name}"),
            Topic::Lobby => f.write_str("lobby"),
        }
    }
}

/// Event published on a room topic.
///
/// Rosters in `Joined`/`Left` always describe membership after the triggering
/// change was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastEvent {
    Chat {
        content: MessageContent,
        author_id: UserId,
        author_name: DisplayName,
        author_avatar: AvatarRef,
    },
    Joined {
        announcement: String,
        roster: Vec<RosterEntry>,
    },
    Left {
        announcement: String,
        roster: Vec<RosterEntry>,
    },
}

impl BroadcastEvent {
    pub fn joined(user: &DisplayName, roster: Vec<RosterEntry>) -> Self {
        BroadcastEvent::Joined {
            announcement: format!("{user} joined the room"),
            roster,
        }
    }

    pub fn left(user: &DisplayName, roster: Vec<RosterEntry>) -> Self {
        BroadcastEvent::Left {
            announcement: format!("{user} left the room"),
            roster,
        }
    }

    /// Roster carried by a presence notice, `None` for chat.
    pub fn roster(&self) -> Option<&[RosterEntry]> {
        match self {
            BroadcastEvent::Chat { .. } => None,
            BroadcastEvent::Joined { roster, .. } | BroadcastEvent::Left { roster, .. } => {
                Some(roster)
            }
        }
    }
}

/// All known rooms with their live member counts, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbySnapshot {
    pub rooms: Vec<RoomSummary>,
}

/// Anything delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEvent {
    Room(BroadcastEvent),
    Lobby(LobbySnapshot),
}

/// Command decoded from a room channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    Chat(MessageContent),
    Leave,
}

/// Per-connection delivery channel registered with a broadcast group.
pub type EventSender = mpsc::UnboundedSender<Arc<TopicEvent>>;
pub type EventReceiver = mpsc::UnboundedReceiver<Arc<TopicEvent>>;
