//! InMemory Room Registry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//! ルーム名をキーにした `BTreeMap` をインメモリ DB として使用します。
//!
//! ## ロックの粒度
//!
//! - ルームマップ全体の `RwLock`: ルームの検索・作成の間だけ保持
//! - ルームごとの `Mutex<Room>`: メンバー集合の読み書きの間だけ保持
//! - ルームごとのプレゼンスロック: 「変更 → ロスター計算 → publish」を直列化
//!
//! 異なるルームへの操作は互いにブロックしません。

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use lounge_shared::time::Clock;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    PresenceGuard, Room, RoomName, RoomRegistry, RoomSummary, RosterEntry, Timestamp, UserId,
};

/// ルーム 1 つ分の状態
struct RoomSlot {
    room: Mutex<Room>,
    presence: Arc<Mutex<()>>,
}

impl RoomSlot {
    fn new(room: Room) -> Self {
        Self {
            room: Mutex::new(room),
            presence: Arc::new(Mutex::new(())),
        }
    }
}

/// インメモリ Room Registry 実装
pub struct InMemoryRoomRegistry {
    rooms: RwLock<BTreeMap<RoomName, Arc<RoomSlot>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    ///
    /// `clock` はルーム作成時刻の記録に使います。
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    /// ルームのスロットを取得（存在しなければ作成）
    async fn slot(&self, name: &RoomName) -> Arc<RoomSlot> {
        {
            let rooms = self.rooms.read().await;
            if let Some(slot) = rooms.get(name) {
                return slot.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(name.clone())
            .or_insert_with(|| {
                tracing::info!("Room '{}' created", name);
                Arc::new(RoomSlot::new(Room::new(
                    name.clone(),
                    Timestamp::new(self.clock.now_millis()),
                )))
            })
            .clone()
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn get_or_create(&self, room: &RoomName) -> Room {
        let slot = self.slot(room).await;
        let room = slot.room.lock().await;
        room.clone()
    }

    async fn list_rooms(&self) -> Vec<RoomSummary> {
        let slots: Vec<Arc<RoomSlot>> = {
            let rooms = self.rooms.read().await;
            rooms.values().cloned().collect()
        };

        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            let room = slot.room.lock().await;
            summaries.push(RoomSummary {
                name: room.name.clone(),
                member_count: room.member_count(),
            });
        }
        summaries
    }

    async fn add_member(&self, room: &RoomName, member: RosterEntry) -> bool {
        let slot = self.slot(room).await;
        let mut room = slot.room.lock().await;
        room.add_member(member)
    }

    async fn remove_member(&self, room: &RoomName, user_id: &UserId) -> bool {
        let slot = self.slot(room).await;
        let mut room = slot.room.lock().await;
        room.remove_member(user_id)
    }

    async fn members(&self, room: &RoomName) -> Vec<RosterEntry> {
        let slot = self.slot(room).await;
        let room = slot.room.lock().await;
        room.members.clone()
    }

    async fn lock_presence(&self, room: &RoomName) -> PresenceGuard {
        let slot = self.slot(room).await;
        slot.presence.clone().lock_owned().await
    }
}
