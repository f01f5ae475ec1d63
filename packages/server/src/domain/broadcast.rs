//! Broadcast Group trait 定義
//!
//! 「トピック X を購読している全ての接続」への配信を抽象化します。
//! 最初はプロセス内実装で動かし、後からネットワーク越しのトランスポートに
//! 差し替えてもセッションのロジックは変わりません。

use async_trait::async_trait;

use super::{
    event::{EventSender, Topic, TopicEvent},
    value_object::ConnectionId,
};

#[async_trait]
pub trait BroadcastGroup: Send + Sync {
    /// 接続をトピックに登録する（同じ接続の再登録は sender を置き換えるだけ）
    async fn subscribe(&self, topic: &Topic, connection: ConnectionId, sender: EventSender);

    /// 接続をトピックから外す（未登録でも何もしない）
    async fn unsubscribe(&self, topic: &Topic, connection: &ConnectionId);

    /// publish 時点の購読者全員に配信し、配信できた接続数を返す
    ///
    /// 同じ publisher からの publish は、各購読者に publish 順で届きます。
    async fn publish(&self, topic: &Topic, event: TopicEvent) -> usize;

    /// 現在の購読者数
    async fn subscriber_count(&self, topic: &Topic) -> usize;
}
