//! Presence Tracker
//!
//! 接続してきたユーザーを「新規参加 / 何もしない」に振り分け、表示用メタデータ付きの
//! ロスターを計算するドメインサービスです。状態は持たず、全ての状態は Room Registry にあります。
//!
//! ## 順序保証
//!
//! `join` / `leave` は Registry のプレゼンスロックを取得してからメンバーを変更し、
//! 変更後のメンバーからロスターを計算します。ロックは返される `PresenceUpdate` が
//! publish を終えるまで保持されるため、同じルームの購読者が 1 つ前の状態のロスターを
//! 受け取ることはありません。
//!
//! 参加者のアバターはロックを取る前に解決し、メンバーシップと一緒に Registry に保持します。
//! ロック中のロスター計算は Registry のデータだけで行い、プロフィール取得を待ちません。

use std::sync::Arc;

use super::{
    broadcast::BroadcastGroup,
    entity::{Member, RosterEntry},
    error::ProfileError,
    event::{BroadcastEvent, Topic, TopicEvent},
    profile::ProfileLookup,
    repository::{PresenceGuard, RoomRegistry},
    value_object::{AvatarRef, RoomName, UserId},
};

/// メンバー変更の結果（変更後のロスターと、publish までの順序保証）
pub struct PresenceUpdate {
    roster: Vec<RosterEntry>,
    _sequence: PresenceGuard,
}

impl PresenceUpdate {
    /// 変更後のロスター
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// ロスターからイベントを組み立てて publish し、その後で順序ロックを解放する
    pub async fn publish<F>(self, broadcast: &dyn BroadcastGroup, topic: &Topic, build: F) -> usize
    where
        F: FnOnce(Vec<RosterEntry>) -> BroadcastEvent,
    {
        let PresenceUpdate { roster, _sequence } = self;
        let delivered = broadcast
            .publish(topic, TopicEvent::Room(build(roster)))
            .await;
        drop(_sequence);
        delivered
    }
}

pub struct PresenceTracker {
    registry: Arc<dyn RoomRegistry>,
    profiles: Arc<dyn ProfileLookup>,
    placeholder_avatar: AvatarRef,
}

impl PresenceTracker {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        profiles: Arc<dyn ProfileLookup>,
        placeholder_avatar: AvatarRef,
    ) -> Self {
        Self {
            registry,
            profiles,
            placeholder_avatar,
        }
    }

    /// ユーザーをルームに参加させる
    ///
    /// 新規参加なら変更後のロスターを返し、既にメンバーなら `None` を返す。
    pub async fn join(&self, room: &RoomName, member: Member) -> Option<PresenceUpdate> {
        let avatar = self.avatar_for(&member.id).await;
        let sequence = self.registry.lock_presence(room).await;
        let user_id = member.id.clone();
        if !self
            .registry
            .add_member(room, member.into_roster_entry(avatar))
            .await
        {
            tracing::debug!("User '{}' is already a member of '{}'", user_id, room);
            return None;
        }
        let roster = self.roster(room).await;
        Some(PresenceUpdate {
            roster,
            _sequence: sequence,
        })
    }

    /// ユーザーをルームから退出させる
    ///
    /// 削除されたら変更後のロスターを返し、メンバーでなければ `None` を返す。
    pub async fn leave(&self, room: &RoomName, user_id: &UserId) -> Option<PresenceUpdate> {
        let sequence = self.registry.lock_presence(room).await;
        if !self.registry.remove_member(room, user_id).await {
            tracing::debug!("User '{}' was not a member of '{}'", user_id, room);
            return None;
        }
        let roster = self.roster(room).await;
        Some(PresenceUpdate {
            roster,
            _sequence: sequence,
        })
    }

    /// 現在のロスター（参加順）
    pub async fn roster(&self, room: &RoomName) -> Vec<RosterEntry> {
        self.registry.members(room).await
    }

    /// アバターを解決する（失敗時はプレースホルダー）
    pub async fn avatar_for(&self, user_id: &UserId) -> AvatarRef {
        match self.profiles.get_profile(user_id).await {
            Ok(profile) => profile.avatar,
            Err(ProfileError::NotFound(_)) => self.placeholder_avatar.clone(),
            Err(e) => {
                tracing::warn!("Using placeholder avatar for '{}': {}", user_id, e);
                self.placeholder_avatar.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            DisplayName,
            profile::{MockProfileLookup, Profile},
        },
        infrastructure::{broadcast::InProcessBroadcastGroup, repository::InMemoryRoomRegistry},
    };
    use lounge_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn member(id: &str) -> Member {
        Member::new(
            UserId::new(id.to_string()).unwrap(),
            DisplayName::new(id.to_uppercase()).unwrap(),
        )
    }

    fn avatar(value: &str) -> AvatarRef {
        AvatarRef::new(value.to_string()).unwrap()
    }

    fn general() -> RoomName {
        RoomName::new("general".to_string()).unwrap()
    }

    fn create_tracker(profiles: MockProfileLookup) -> (PresenceTracker, Arc<InMemoryRoomRegistry>) {
        let registry = Arc::new(InMemoryRoomRegistry::new(Arc::new(FixedClock::new(1000))));
        let tracker = PresenceTracker::new(
            registry.clone(),
            Arc::new(profiles),
            avatar("/media/default.jpg"),
        );
        (tracker, registry)
    }

    fn profiles_with_avatars() -> MockProfileLookup {
        let mut profiles = MockProfileLookup::new();
        profiles.expect_get_profile().returning(|user_id| {
            Ok(Profile {
                avatar: AvatarRef::new(format!("/media/{}.png", user_id.as_str())).unwrap(),
            })
        });
        profiles
    }

    #[tokio::test]
    async fn test_join_new_member_returns_post_join_roster() {
        // テスト項目: 新規参加時は参加後のロスターが返される
        // given (前提条件):
        let (tracker, _registry) = create_tracker(profiles_with_avatars());
        tracker.join(&general(), member("alice")).await;

        // when (操作):
        let update = tracker.join(&general(), member("bob")).await;

        // then (期待する結果):
        let update = update.expect("bob should be a new member");
        let ids: Vec<&str> = update.roster().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
        assert_eq!(update.roster()[1].name.as_str(), "BOB");
        assert_eq!(update.roster()[1].avatar.as_str(), "/media/bob.png");
    }

    #[tokio::test]
    async fn test_join_existing_member_is_noop() {
        // テスト項目: 既にメンバーのユーザーが参加しても何も起きない
        // given (前提条件):
        let (tracker, registry) = create_tracker(profiles_with_avatars());
        assert!(tracker.join(&general(), member("alice")).await.is_some());

        // when (操作):
        let update = tracker.join(&general(), member("alice")).await;

        // then (期待する結果):
        assert!(update.is_none());
        assert_eq!(registry.members(&general()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_absent_member_is_noop() {
        // テスト項目: メンバーでないユーザーの退出は何も起きない
        // given (前提条件):
        let (tracker, _registry) = create_tracker(profiles_with_avatars());

        // when (操作):
        let update = tracker
            .leave(&general(), &UserId::new("ghost".to_string()).unwrap())
            .await;

        // then (期待する結果):
        assert!(update.is_none());
    }

    #[tokio::test]
    async fn test_profile_miss_uses_placeholder() {
        // テスト項目: プロフィールが見つからないメンバーはプレースホルダーで表示される
        // given (前提条件):
        let mut profiles = MockProfileLookup::new();
        profiles.expect_get_profile().returning(|user_id| {
            if user_id.as_str() == "alice" {
                Ok(Profile {
                    avatar: AvatarRef::new("/media/alice.png".to_string()).unwrap(),
                })
            } else {
                Err(ProfileError::NotFound(user_id.as_str().to_string()))
            }
        });
        let (tracker, _registry) = create_tracker(profiles);
        tracker.join(&general(), member("alice")).await;

        // when (操作):
        let update = tracker.join(&general(), member("bob")).await.unwrap();

        // then (期待する結果): bob も省略されずにロスターに残る
        assert_eq!(update.roster().len(), 2);
        assert_eq!(update.roster()[0].avatar.as_str(), "/media/alice.png");
        assert_eq!(update.roster()[1].avatar.as_str(), "/media/default.jpg");
    }

    #[tokio::test]
    async fn test_publish_delivers_roster_event() {
        // テスト項目: PresenceUpdate の publish でロスター付きイベントが配信される
        // given (前提条件):
        let (tracker, _registry) = create_tracker(profiles_with_avatars());
        let broadcast = InProcessBroadcastGroup::new();
        let topic = Topic::Room(general());
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcast
            .subscribe(&topic, crate::domain::ConnectionId::generate(), tx)
            .await;

        // when (操作):
        let alice = member("alice");
        let name = alice.display_name.clone();
        let update = tracker.join(&general(), alice).await.unwrap();
        let delivered = update
            .publish(&broadcast, &topic, |roster| BroadcastEvent::joined(&name, roster))
            .await;

        // then (期待する結果):
        assert_eq!(delivered, 1);
        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            TopicEvent::Room(BroadcastEvent::Joined {
                announcement,
                roster,
            }) => {
                assert_eq!(announcement, "ALICE joined the room");
                assert_eq!(roster.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_presence_lock_is_released_after_publish() {
        // テスト項目: publish 後は同じルームのプレゼンス処理を続けて実行できる
        // given (前提条件):
        let (tracker, _registry) = create_tracker(profiles_with_avatars());
        let broadcast = InProcessBroadcastGroup::new();
        let topic = Topic::Room(general());
        let alice = member("alice");
        let name = alice.display_name.clone();
        let update = tracker.join(&general(), alice).await.unwrap();
        update
            .publish(&broadcast, &topic, |roster| BroadcastEvent::joined(&name, roster))
            .await;

        // when (操作):
        let next = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            tracker.join(&general(), member("bob")),
        )
        .await;

        // then (期待する結果): デッドロックしない
        assert!(next.expect("presence lock should be free").is_some());
    }

    /// alice のプロフィール取得だけが遅いディレクトリ
    struct SlowForAlice;

    #[async_trait::async_trait]
    impl ProfileLookup for SlowForAlice {
        async fn get_profile(&self, user_id: &UserId) -> Result<Profile, ProfileError> {
            if user_id.as_str() == "alice" {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            }
            Ok(Profile {
                avatar: AvatarRef::new(format!("/media/{}.png", user_id.as_str())).unwrap(),
            })
        }
    }

    #[tokio::test]
    async fn test_slow_profile_lookup_does_not_block_other_joins() {
        // テスト項目: あるユーザーのプロフィール取得が遅くても、同じルームへの別の参加は待たされない
        // given (前提条件):
        let registry = Arc::new(InMemoryRoomRegistry::new(Arc::new(FixedClock::new(1000))));
        let tracker = Arc::new(PresenceTracker::new(
            registry.clone(),
            Arc::new(SlowForAlice),
            avatar("/media/default.jpg"),
        ));
        let slow = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.join(&general(), member("alice")).await.is_some() })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // when (操作):
        let bob = tokio::time::timeout(
            std::time::Duration::from_millis(500),
            tracker.join(&general(), member("bob")),
        )
        .await;

        // then (期待する結果):
        let update = bob
            .expect("bob's join must not wait for alice's profile lookup")
            .expect("bob is a new member");
        assert_eq!(update.roster().len(), 1);
        drop(update);
        assert!(slow.await.unwrap());
        let ids: Vec<String> = registry
            .members(&general())
            .await
            .into_iter()
            .map(|e| e.id.into_string())
            .collect();
        assert_eq!(ids, vec!["bob", "alice"]);
    }

    #[tokio::test]
    async fn test_roster_uses_avatar_resolved_at_join() {
        // テスト項目: ロスター計算ではプロフィールを再取得せず、参加時に解決したアバターを使う
        // given (前提条件):
        let mut profiles = MockProfileLookup::new();
        profiles
            .expect_get_profile()
            .times(2)
            .returning(|user_id| {
                Ok(Profile {
                    avatar: AvatarRef::new(format!("/media/{}.png", user_id.as_str())).unwrap(),
                })
            });
        let (tracker, _registry) = create_tracker(profiles);
        tracker.join(&general(), member("alice")).await;

        // when (操作):
        let update = tracker.join(&general(), member("bob")).await.unwrap();

        // then (期待する結果): 参加 2 回分のプロフィール取得だけで済む
        let avatars: Vec<&str> = update.roster().iter().map(|e| e.avatar.as_str()).collect();
        assert_eq!(avatars, vec!["/media/alice.png", "/media/bob.png"]);
    }
}
