//! UseCase: ルームの履歴・状態取得

use std::sync::Arc;

use crate::domain::{ChatMessage, MessageStore, Room, RoomName, RoomRegistry, StorageError};

/// ルームの会話履歴を取得するユースケース
///
/// 参照されたルームが未作成の場合は Store と Registry の双方に作成します。
pub struct GetRoomHistoryUseCase {
    store: Arc<dyn MessageStore>,
    registry: Arc<dyn RoomRegistry>,
}

impl GetRoomHistoryUseCase {
    pub fn new(store: Arc<dyn MessageStore>, registry: Arc<dyn RoomRegistry>) -> Self {
        Self { store, registry }
    }

    /// 保存順（古い順）のメッセージ一覧を返す
    pub async fn execute(&self, room: &RoomName) -> Result<Vec<ChatMessage>, StorageError> {
        self.store.get_or_create_room(room).await?;
        self.registry.get_or_create(room).await;
        self.store.history(room).await
    }
}

/// ルームの現在の状態（メンバー一覧）を取得するユースケース（デバッグ用）
pub struct GetRoomStateUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl GetRoomStateUseCase {
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, room: &RoomName) -> Room {
        self.registry.get_or_create(room).await
    }
}
