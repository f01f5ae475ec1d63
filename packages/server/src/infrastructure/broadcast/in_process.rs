//! プロセス内 BroadcastGroup 実装
//!
//! ## 責務
//!
//! - トピックごとに購読中の接続と、その `EventSender` を管理
//! - publish 時点の購読者全員へのイベント配信
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層で行われます。この実装は UI 層が作った
//! `EventSender` を受け取り、イベントを流し込むだけです。
//! 受信側が閉じた sender は publish 時に見つけ次第取り除きます。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{BroadcastGroup, ConnectionId, EventSender, Topic, TopicEvent};

/// プロセス内 BroadcastGroup 実装
///
/// ## フィールド
///
/// - `topics`: トピックごとの購読者マップ。購読者がいなくなったトピックはエントリごと削除します。
///
/// ## 使用例
///
/// ```ignore
/// let group = InProcessBroadcastGroup::new();
/// group.subscribe(&Topic::Lobby, connection_id, tx).await;
/// group.publish(&Topic::Lobby, TopicEvent::Lobby(snapshot)).await;
/// ```
#[derive(Default)]
pub struct InProcessBroadcastGroup {
    topics: Mutex<HashMap<Topic, HashMap<ConnectionId, EventSender>>>,
}

impl InProcessBroadcastGroup {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BroadcastGroup for InProcessBroadcastGroup {
    async fn subscribe(&self, topic: &Topic, connection: ConnectionId, sender: EventSender) {
        let mut topics = self.topics.lock().await;
        topics
            .entry(topic.clone())
            .or_default()
            .insert(connection, sender);
        tracing::debug!("Connection '{}' subscribed to '{}'", connection, topic);
    }

    async fn unsubscribe(&self, topic: &Topic, connection: &ConnectionId) {
        let mut topics = self.topics.lock().await;
        if let Some(subscribers) = topics.get_mut(topic) {
            if subscribers.remove(connection).is_some() {
                tracing::debug!("Connection '{}' unsubscribed from '{}'", connection, topic);
            }
            if subscribers.is_empty() {
                topics.remove(topic);
            }
        }
    }

    async fn publish(&self, topic: &Topic, event: TopicEvent) -> usize {
        let event = Arc::new(event);
        let mut topics = self.topics.lock().await;
        let Some(subscribers) = topics.get_mut(topic) else {
            tracing::debug!("No subscribers on '{}', dropping event", topic);
            return 0;
        };

        // 送信失敗（受信側が閉じている）は許容し、その接続を取り除く
        let mut delivered = 0;
        subscribers.retain(|connection, sender| match sender.send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::warn!(
                    "Connection '{}' on '{}' is closed, removing subscription",
                    connection,
                    topic
                );
                false
            }
        });
        if subscribers.is_empty() {
            topics.remove(topic);
        }

        tracing::debug!("Published to {} subscriber(s) on '{}'", delivered, topic);
        delivered
    }

    async fn subscriber_count(&self, topic: &Topic) -> usize {
        let topics = self.topics.lock().await;
        topics.get(topic).map_or(0, HashMap::len)
    }
}
