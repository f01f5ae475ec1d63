//! InMemory Message Store 実装
//!
//! Message Store Adapter のインメモリ実装。ルームレコードは作成順に、
//! メッセージはルームごとに保存順で保持します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use lounge_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, MessageContent, MessageStore, RoomName, StorageError, Timestamp, UserId,
};

#[derive(Default)]
struct StoreState {
    /// 作成順のルーム名
    rooms: Vec<RoomName>,
    messages: HashMap<RoomName, Vec<ChatMessage>>,
}

/// インメモリ Message Store 実装
pub struct InMemoryMessageStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(
        &self,
        room: &RoomName,
        author: &UserId,
        content: &MessageContent,
    ) -> Result<ChatMessage, StorageError> {
        let mut state = self.state.lock().await;
        let messages = state
            .messages
            .get_mut(room)
            .ok_or_else(|| StorageError::RoomNotFound(room.as_str().to_string()))?;

        // ルーム内では時刻が逆行しない
        let now = self.clock.now_millis();
        let last = messages.last().map(|m| m.timestamp.value()).unwrap_or(now);
        let message = ChatMessage {
            room: room.clone(),
            author: author.clone(),
            content: content.clone(),
            timestamp: Timestamp::new(now.max(last)),
        };
        messages.push(message.clone());
        Ok(message)
    }

    async fn get_or_create_room(&self, room: &RoomName) -> Result<RoomName, StorageError> {
        let mut state = self.state.lock().await;
        if !state.messages.contains_key(room) {
            state.rooms.push(room.clone());
            state.messages.insert(room.clone(), Vec::new());
            tracing::debug!("Room record '{}' stored", room);
        }
        Ok(room.clone())
    }

    async fn list_all_rooms(&self) -> Result<Vec<RoomName>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.rooms.clone())
    }

    async fn history(&self, room: &RoomName) -> Result<Vec<ChatMessage>, StorageError> {
        let state = self.state.lock().await;
        state
            .messages
            .get(room)
            .cloned()
            .ok_or_else(|| StorageError::RoomNotFound(room.as_str().to_string()))
    }
}
