//! ドメイン層
//!
//! ルーム・メンバー・ブロードキャストイベントのモデルと、
//! 外部コラボレーターへのインターフェース（trait）を定義します。

pub mod broadcast;
pub mod entity;
pub mod error;
pub mod event;
pub mod presence;
pub mod profile;
pub mod repository;
pub mod value_object;

pub use broadcast::BroadcastGroup;
pub use entity::{ChatMessage, Member, Room, RoomSummary, RosterEntry};
pub use error::{ProfileError, ProtocolError, StorageError, ValueObjectError};
pub use event::{
    BroadcastEvent, EventReceiver, EventSender, LobbySnapshot, RoomCommand, Topic,
    TopicEvent,
};
pub use presence::{PresenceTracker, PresenceUpdate};
pub use profile::{Profile, ProfileLookup};
pub use repository::{MessageStore, PresenceGuard, RoomRegistry};
pub use value_object::{
    AvatarRef, ConnectionId, DisplayName, MessageContent, RoomName, Timestamp, UserId,
};
