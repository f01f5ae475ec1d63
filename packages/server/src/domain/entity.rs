//! エンティティ
//!
//! - `Room`: ルーム名で識別され、メンバー集合を持つ
//! - `Member`: ルームに所属するユーザー（ID と表示名）
//! - `ChatMessage`: Message Store が永続化したチャットメッセージ
//! - `RosterEntry`: 表示用メタデータ（アバター）付きのメンバー。Registry はこの形で保持する

use serde::Serialize;

use super::value_object::{AvatarRef, DisplayName, MessageContent, RoomName, Timestamp, UserId};

/// ルームのメンバー
///
/// 表示名は参加時の接続コンテキストから取得したものを保持します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: UserId,
    pub display_name: DisplayName,
}

impl Member {
    pub fn new(id: UserId, display_name: DisplayName) -> Self {
        Self { id, display_name }
    }

    /// 解決済みのアバターを付けてロスターの 1 行にする
    pub fn into_roster_entry(self, avatar: AvatarRef) -> RosterEntry {
        RosterEntry {
            id: self.id,
            name: self.display_name,
            avatar,
        }
    }
}

/// ルーム
///
/// ## 不変条件
///
/// - `members` に同じ `UserId` は最大 1 回しか現れない（参加は冪等）
/// - `members` は参加順に並ぶ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub name: RoomName,
    pub members: Vec<RosterEntry>,
    pub created_at: Timestamp,
}

impl Room {
    /// メンバーが空のルームを作成
    pub fn new(name: RoomName, created_at: Timestamp) -> Self {
        Self {
            name,
            members: Vec::new(),
            created_at,
        }
    }

    /// メンバーを追加する
    ///
    /// 新しく追加された場合は `true`、既にメンバーだった場合は `false` を返す。
    pub fn add_member(&mut self, member: RosterEntry) -> bool {
        if self.contains(&member.id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// メンバーを削除する
    ///
    /// 削除された場合は `true`、メンバーでなかった場合は `false` を返す。
    pub fn remove_member(&mut self, user_id: &UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.id != user_id);
        self.members.len() != before
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.id == user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// ロビーに表示するルームの概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: RoomName,
    pub member_count: usize,
}

/// 永続化済みのチャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub room: RoomName,
    pub author: UserId,
    pub content: MessageContent,
    pub timestamp: Timestamp,
}

/// 表示用メタデータ付きのメンバー
///
/// アバターは参加時にルームのロックの外で解決され、メンバーシップと一緒に保持されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub id: UserId,
    pub name: DisplayName,
    pub avatar: AvatarRef,
}
