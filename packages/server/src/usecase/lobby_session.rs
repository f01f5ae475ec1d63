//! UseCase: ロビー接続セッション
//!
//! 全ルームとそのメンバー数を配信するフィードです。スナップショットはロビー接続の
//! 開始時と終了時にだけ再計算されるため、ルームの参加・退出が即座に反映されるとは
//! 限りません（結果整合）。

use std::{collections::HashSet, sync::Arc};

use crate::domain::{
    BroadcastGroup, ConnectionId, EventSender, LobbySnapshot, MessageStore, RoomRegistry,
    RoomSummary, Topic, TopicEvent,
};

/// ロビーのユースケース（全接続で共有）
pub struct LobbySessionUseCase {
    store: Arc<dyn MessageStore>,
    registry: Arc<dyn RoomRegistry>,
    broadcast: Arc<dyn BroadcastGroup>,
}

impl LobbySessionUseCase {
    pub fn new(
        store: Arc<dyn MessageStore>,
        registry: Arc<dyn RoomRegistry>,
        broadcast: Arc<dyn BroadcastGroup>,
    ) -> Self {
        Self {
            store,
            registry,
            broadcast,
        }
    }

    /// 現在のロビースナップショットを計算する
    ///
    /// ルームの並びは Message Store の作成順。Store にだけあるルームは Registry に
    /// 作成してから数え、Registry にだけあるルームは名前順で末尾に付け加えます。
    /// Store の一覧取得に失敗した場合は Registry の一覧だけを使います。
    pub async fn snapshot(&self) -> LobbySnapshot {
        let registry_rooms = self.registry.list_rooms().await;

        let stored = match self.store.list_all_rooms().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Room listing unavailable, using registry only: {}", e);
                return LobbySnapshot {
                    rooms: registry_rooms,
                };
            }
        };

        let mut seen = HashSet::with_capacity(stored.len());
        let mut rooms = Vec::with_capacity(stored.len().max(registry_rooms.len()));
        for name in stored {
            if !seen.insert(name.clone()) {
                continue;
            }
            let room = self.registry.get_or_create(&name).await;
            rooms.push(RoomSummary {
                member_count: room.member_count(),
                name,
            });
        }
        rooms.extend(
            registry_rooms
                .into_iter()
                .filter(|summary| !seen.contains(&summary.name)),
        );

        LobbySnapshot { rooms }
    }

    /// ロビー接続を開始する（Connecting → Active）
    ///
    /// スナップショットを計算して購読し、ロビーの全購読者へ publish します。
    pub async fn open(self: &Arc<Self>, sender: EventSender) -> LobbySession {
        let connection = ConnectionId::generate();
        let snapshot = self.snapshot().await;
        self.broadcast
            .subscribe(&Topic::Lobby, connection, sender)
            .await;
        let delivered = self
            .broadcast
            .publish(&Topic::Lobby, TopicEvent::Lobby(snapshot))
            .await;
        tracing::info!(
            "Lobby connection '{}' opened (refreshed {} connection(s))",
            connection,
            delivered
        );

        LobbySession {
            usecase: self.clone(),
            connection,
            subscribed: true,
        }
    }
}

/// 1 接続分のロビーセッション
pub struct LobbySession {
    usecase: Arc<LobbySessionUseCase>,
    connection: ConnectionId,
    subscribed: bool,
}

impl LobbySession {
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// ロビー接続を終了する（Active → Disconnected）
    ///
    /// 新しいスナップショットを publish してから購読を解除します。
    pub async fn close(mut self) {
        let snapshot = self.usecase.snapshot().await;
        self.usecase
            .broadcast
            .publish(&Topic::Lobby, TopicEvent::Lobby(snapshot))
            .await;
        self.usecase
            .broadcast
            .unsubscribe(&Topic::Lobby, &self.connection)
            .await;
        self.subscribed = false;
        tracing::info!("Lobby connection '{}' closed", self.connection);
    }
}

impl Drop for LobbySession {
    fn drop(&mut self) {
        if !self.subscribed {
            return;
        }
        let broadcast = self.usecase.broadcast.clone();
        let connection = self.connection;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                broadcast.unsubscribe(&Topic::Lobby, &connection).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            AvatarRef, DisplayName, EventReceiver, Member, RoomName, RosterEntry, StorageError,
            UserId, repository::MockMessageStore,
        },
        infrastructure::{
            broadcast::InProcessBroadcastGroup,
            repository::{InMemoryMessageStore, InMemoryRoomRegistry},
        },
    };
    use lounge_shared::time::FixedClock;
    use tokio::sync::mpsc;

    struct Fixture {
        usecase: Arc<LobbySessionUseCase>,
        store: Arc<dyn MessageStore>,
        registry: Arc<InMemoryRoomRegistry>,
        broadcast: Arc<InProcessBroadcastGroup>,
    }

    fn create_fixture_with_store(store: Arc<dyn MessageStore>) -> Fixture {
        let registry = Arc::new(InMemoryRoomRegistry::new(Arc::new(FixedClock::new(1000))));
        let broadcast = Arc::new(InProcessBroadcastGroup::new());
        let usecase = Arc::new(LobbySessionUseCase::new(
            store.clone(),
            registry.clone(),
            broadcast.clone(),
        ));
        Fixture {
            usecase,
            store,
            registry,
            broadcast,
        }
    }

    fn create_fixture() -> Fixture {
        create_fixture_with_store(Arc::new(InMemoryMessageStore::new(Arc::new(
            FixedClock::new(1000),
        ))))
    }

    fn room(name: &str) -> RoomName {
        RoomName::new(name.to_string()).unwrap()
    }

    fn member(id: &str) -> RosterEntry {
        Member::new(
            UserId::new(id.to_string()).unwrap(),
            DisplayName::new(id.to_string()).unwrap(),
        )
        .into_roster_entry(AvatarRef::new("/media/default.jpg".to_string()).unwrap())
    }

    fn counts(snapshot: &LobbySnapshot) -> Vec<(&str, usize)> {
        snapshot
            .rooms
            .iter()
            .map(|r| (r.name.as_str(), r.member_count))
            .collect()
    }

    fn next_snapshot(rx: &mut EventReceiver) -> LobbySnapshot {
        match rx.try_recv().expect("expected a lobby event").as_ref() {
            TopicEvent::Lobby(snapshot) => snapshot.clone(),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_snapshot_follows_store_order_and_creates_rooms() {
        // テスト項目: Store の順でルームが並び、Registry に無いルームは作成されて 0 人と数えられる
        // given (前提条件):
        let fixture = create_fixture();
        fixture.store.get_or_create_room(&room("zeta")).await.unwrap();
        fixture.store.get_or_create_room(&room("alpha")).await.unwrap();
        fixture.registry.add_member(&room("alpha"), member("alice")).await;

        // when (操作):
        let snapshot = fixture.usecase.snapshot().await;

        // then (期待する結果):
        assert_eq!(counts(&snapshot), vec![("zeta", 0), ("alpha", 1)]);
        assert_eq!(fixture.registry.list_rooms().await.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_appends_registry_only_rooms() {
        // テスト項目: Registry にだけあるルームも末尾に含まれる
        // given (前提条件):
        let fixture = create_fixture();
        fixture.store.get_or_create_room(&room("general")).await.unwrap();
        fixture.registry.add_member(&room("beta"), member("bob")).await;

        // when (操作):
        let snapshot = fixture.usecase.snapshot().await;

        // then (期待する結果):
        assert_eq!(counts(&snapshot), vec![("general", 0), ("beta", 1)]);
    }

    #[tokio::test]
    async fn test_snapshot_falls_back_to_registry_on_store_error() {
        // テスト項目: Store の一覧取得に失敗しても Registry からスナップショットを作る
        // given (前提条件):
        let mut store = MockMessageStore::new();
        store
            .expect_list_all_rooms()
            .returning(|| Err(StorageError::Unavailable("offline".to_string())));
        let fixture = create_fixture_with_store(Arc::new(store));
        fixture.registry.add_member(&room("general"), member("alice")).await;

        // when (操作):
        let snapshot = fixture.usecase.snapshot().await;

        // then (期待する結果):
        assert_eq!(counts(&snapshot), vec![("general", 1)]);
    }

    #[tokio::test]
    async fn test_open_publishes_snapshot_to_every_lobby_client() {
        // テスト項目: ロビー接続時に、既存のロビー接続を含む全員へスナップショットが配信される
        // given (前提条件):
        let fixture = create_fixture();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let _first = fixture.usecase.open(tx1).await;
        next_snapshot(&mut rx1);
        fixture.registry.add_member(&room("general"), member("alice")).await;

        // when (操作):
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let _second = fixture.usecase.open(tx2).await;

        // then (期待する結果):
        assert_eq!(counts(&next_snapshot(&mut rx1)), vec![("general", 1)]);
        assert_eq!(counts(&next_snapshot(&mut rx2)), vec![("general", 1)]);
    }

    #[tokio::test]
    async fn test_close_republishes_and_unsubscribes() {
        // テスト項目: 切断時は残りのロビー接続へ再配信し、自分の購読は解除される
        // given (前提条件):
        let fixture = create_fixture();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let _stay = fixture.usecase.open(tx1).await;
        let leaving = fixture.usecase.open(tx2).await;
        while rx1.try_recv().is_ok() {}
        while rx2.try_recv().is_ok() {}
        fixture.registry.add_member(&room("general"), member("alice")).await;

        // when (操作):
        leaving.close().await;

        // then (期待する結果):
        assert_eq!(counts(&next_snapshot(&mut rx1)), vec![("general", 1)]);
        assert_eq!(fixture.broadcast.subscriber_count(&Topic::Lobby).await, 1);
    }
}
