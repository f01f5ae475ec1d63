//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `RoomRegistry`: ルームとメンバーのインメモリな正本
//! - `MessageStore`: チャットメッセージとルームレコードの永続化（外部コラボレーター）

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use super::{
    entity::{ChatMessage, Room, RoomSummary, RosterEntry},
    error::StorageError,
    value_object::{MessageContent, RoomName, UserId},
};

/// ルーム単位のプレゼンス処理の順序を保証するガード
///
/// 保持している間、同じルームに対する「メンバー変更 → ロスター計算 → publish」の
/// 一連の処理は他の接続から割り込まれません。他のルームには影響しません。
pub type PresenceGuard = OwnedMutexGuard<()>;

/// Room Registry trait
///
/// 全ての操作は失敗しません。存在しないルームは参照された時点で作成されます。
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// ルームを取得（存在しなければ空のルームを作成）
    async fn get_or_create(&self, room: &RoomName) -> Room;

    /// 全ルームと現在のメンバー数を名前順で取得
    async fn list_rooms(&self) -> Vec<RoomSummary>;

    /// メンバーを追加（新しく追加された場合のみ `true`）
    async fn add_member(&self, room: &RoomName, member: RosterEntry) -> bool;

    /// メンバーを削除（削除された場合のみ `true`）
    async fn remove_member(&self, room: &RoomName, user_id: &UserId) -> bool;

    /// 現在のメンバー一覧（参加順）
    async fn members(&self, room: &RoomName) -> Vec<RosterEntry>;

    /// ルームのプレゼンス処理を直列化するロックを取得
    async fn lock_presence(&self, room: &RoomName) -> PresenceGuard;
}

/// Message Store Adapter trait
///
/// 永続化は外部の責務です。コーディネーターはメッセージを書き込むだけで、
/// 配信のために読み戻すことはありません。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを永続化し、タイムスタンプ付きのメッセージを返す
    async fn save_message(
        &self,
        room: &RoomName,
        author: &UserId,
        content: &MessageContent,
    ) -> Result<ChatMessage, StorageError>;

    /// ルームレコードを取得（存在しなければ作成）
    async fn get_or_create_room(&self, room: &RoomName) -> Result<RoomName, StorageError>;

    /// 全ルーム名を作成順で取得
    async fn list_all_rooms(&self) -> Result<Vec<RoomName>, StorageError>;

    /// ルームのメッセージ履歴を古い順で取得
    async fn history(&self, room: &RoomName) -> Result<Vec<ChatMessage>, StorageError>;
}
