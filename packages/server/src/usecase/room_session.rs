//! UseCase: ルーム接続セッション
//!
//! 1 つの接続が 1 つのルームで過ごすライフサイクルを状態機械として扱います。
//!
//! ```text
//! ──accept──▶ Connecting ──open──▶ Active ──{"sair"}──▶ Left
//!                 │                  │                   │
//!                 └──────────────────┴──── close ────────┴──▶ Disconnected
//! ```
//!
//! - `accept`: ルームトピックを購読する。WebSocket のアップグレード前に呼ぶことで、
//!   接続が確立するまでの間に publish されたイベントも取りこぼさない
//! - `open`: ルームレコードを作成し、新規メンバーなら参加通知を publish
//! - `handle`: チャットは永続化してから publish、退出はメンバー削除 → 退出通知 → 購読解除
//! - `close`: 購読解除のみ。メンバーシップは変更しない（明示的な退出だけが削除する）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 参加通知の重複排除と、参加・退出通知に載るロスターの鮮度
//! - 永続化に失敗したメッセージが配信されないこと
//! - 切断後に購読が残らないこと、切断でメンバーシップが消えないこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加 → チャット → 退出
//! - 異常系：永続化失敗、退出後のフレーム
//! - 並行：同じルームへの同時参加
//! - 取りこぼし：購読から参加までの間に publish されたイベント
//! - キャンセル：退出処理の途中で呼び出し側の future が破棄される

use std::sync::Arc;

use crate::domain::{
    BroadcastEvent, BroadcastGroup, ConnectionId, EventSender, Member, MessageContent,
    MessageStore, PresenceTracker, ProtocolError, RoomCommand, RoomName, Topic, TopicEvent,
};

use super::error::SessionError;

/// 接続時に一度だけ作られる、不変のセッションコンテキスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub room: RoomName,
    pub member: Member,
    pub connection: ConnectionId,
}

impl SessionContext {
    pub fn new(room: RoomName, member: Member) -> Self {
        Self {
            room,
            member,
            connection: ConnectionId::generate(),
        }
    }

    pub fn topic(&self) -> Topic {
        Topic::Room(self.room.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomSessionState {
    /// 購読済み、まだ参加していない
    Connecting,
    Active,
    Left,
}

/// `handle` の結果として次にすべきこと
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Continue,
    Left,
}

/// ルームセッションのユースケース（全接続で共有）
pub struct RoomSessionUseCase {
    /// Message Store（永続化の抽象化）
    store: Arc<dyn MessageStore>,
    /// BroadcastGroup（配信の抽象化）
    broadcast: Arc<dyn BroadcastGroup>,
    /// PresenceTracker（参加判定とロスター計算）
    tracker: Arc<PresenceTracker>,
}

impl RoomSessionUseCase {
    /// 新しい RoomSessionUseCase を作成
    pub fn new(
        store: Arc<dyn MessageStore>,
        broadcast: Arc<dyn BroadcastGroup>,
        tracker: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            store,
            broadcast,
            tracker,
        }
    }

    /// ルームトピックを購読し、Connecting 状態のセッションを返す
    ///
    /// 戻り値が `open` されずに破棄された場合（アップグレード失敗など）も、
    /// 購読は `Drop` で解除されます。
    pub async fn accept(
        self: &Arc<Self>,
        context: SessionContext,
        sender: EventSender,
    ) -> RoomSession {
        self.broadcast
            .subscribe(&context.topic(), context.connection, sender)
            .await;
        tracing::debug!(
            "Connection '{}' of '{}' subscribed to '{}'",
            context.connection,
            context.member.id,
            context.room
        );

        RoomSession {
            usecase: self.clone(),
            context,
            state: RoomSessionState::Connecting,
            subscribed: true,
        }
    }

    /// `accept` と `open` を続けて行う
    pub async fn open(self: &Arc<Self>, context: SessionContext, sender: EventSender) -> RoomSession {
        let mut session = self.accept(context, sender).await;
        session.open().await;
        session
    }

    /// ルームレコードを作成し、新規メンバーなら参加通知を publish する
    ///
    /// 呼び出し時点で購読済みのため、接続したクライアントは自分の参加通知も受け取ります。
    /// 既にメンバーのユーザーなら通知は publish しません。
    async fn join(&self, context: &SessionContext) {
        if let Err(e) = self.store.get_or_create_room(&context.room).await {
            // 永続化とプレゼンスは独立した障害ドメイン
            tracing::warn!("Failed to store room record '{}': {}", context.room, e);
        }

        let topic = context.topic();
        match self
            .tracker
            .join(&context.room, context.member.clone())
            .await
        {
            Some(update) => {
                let name = context.member.display_name.clone();
                let delivered = update
                    .publish(self.broadcast.as_ref(), &topic, |roster| {
                        BroadcastEvent::joined(&name, roster)
                    })
                    .await;
                tracing::info!(
                    "User '{}' joined '{}' (notified {} connection(s))",
                    context.member.id,
                    context.room,
                    delivered
                );
            }
            None => {
                tracing::info!(
                    "User '{}' reconnected to '{}', no join notice",
                    context.member.id,
                    context.room
                );
            }
        }
    }

    /// チャットメッセージを永続化してから配信する
    ///
    /// 永続化に失敗した場合は配信しない。
    async fn send_message(
        &self,
        context: &SessionContext,
        content: MessageContent,
    ) -> Result<(), SessionError> {
        let saved = self
            .store
            .save_message(&context.room, &context.member.id, &content)
            .await?;

        let avatar = self.tracker.avatar_for(&context.member.id).await;
        let event = BroadcastEvent::Chat {
            content: saved.content,
            author_id: saved.author,
            author_name: context.member.display_name.clone(),
            author_avatar: avatar,
        };
        let delivered = self
            .broadcast
            .publish(&context.topic(), TopicEvent::Room(event))
            .await;
        tracing::debug!(
            "Message from '{}' in '{}' delivered to {} connection(s)",
            context.member.id,
            context.room,
            delivered
        );
        Ok(())
    }

    /// 明示的な退出：メンバー削除 → 退出通知 → 購読解除
    async fn leave(&self, context: &SessionContext) {
        let topic = context.topic();
        match self.tracker.leave(&context.room, &context.member.id).await {
            Some(update) => {
                let name = context.member.display_name.clone();
                update
                    .publish(self.broadcast.as_ref(), &topic, |roster| {
                        BroadcastEvent::left(&name, roster)
                    })
                    .await;
                tracing::info!("User '{}' left '{}'", context.member.id, context.room);
            }
            None => {
                tracing::info!(
                    "User '{}' asked to leave '{}' but was not a member",
                    context.member.id,
                    context.room
                );
            }
        }
        self.broadcast
            .unsubscribe(&topic, &context.connection)
            .await;
    }
}

/// 1 接続分のルームセッション
///
/// `close` を呼ばずに破棄された場合も、購読はバックグラウンドで解除されます。
pub struct RoomSession {
    usecase: Arc<RoomSessionUseCase>,
    context: SessionContext,
    state: RoomSessionState,
    subscribed: bool,
}

impl RoomSession {
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn state(&self) -> RoomSessionState {
        self.state
    }

    /// ルームに参加する（Connecting → Active）
    ///
    /// Connecting 以外の状態では何もしません。
    pub async fn open(&mut self) {
        if self.state != RoomSessionState::Connecting {
            return;
        }
        self.usecase.join(&self.context).await;
        self.state = RoomSessionState::Active;
    }

    /// クライアントから受信した 1 フレームを処理する
    pub async fn handle(&mut self, command: RoomCommand) -> Result<SessionStep, SessionError> {
        match self.state {
            RoomSessionState::Connecting => return Err(ProtocolError::BeforeJoin.into()),
            RoomSessionState::Left => return Err(ProtocolError::AfterLeave.into()),
            RoomSessionState::Active => {}
        }

        match command {
            RoomCommand::Chat(content) => {
                self.usecase.send_message(&self.context, content).await?;
                Ok(SessionStep::Continue)
            }
            RoomCommand::Leave => {
                // 呼び出し側の future が破棄されても、メンバー削除・退出通知・購読解除は
                // 別タスクで最後まで実行される
                self.subscribed = false;
                self.state = RoomSessionState::Left;
                let usecase = self.usecase.clone();
                let context = self.context.clone();
                if let Err(e) = tokio::spawn(async move { usecase.leave(&context).await }).await {
                    tracing::error!(
                        "Leave of '{}' from '{}' did not complete: {}",
                        self.context.member.id,
                        self.context.room,
                        e
                    );
                }
                Ok(SessionStep::Left)
            }
        }
    }

    /// 接続の終了（明示的な退出の有無に関わらず呼ぶ）
    ///
    /// 購読を解除するだけで、メンバーシップは変更しません。
    pub async fn close(mut self) {
        if self.subscribed {
            self.usecase
                .broadcast
                .unsubscribe(&self.context.topic(), &self.context.connection)
                .await;
            self.subscribed = false;
        }
        tracing::info!(
            "Connection '{}' of '{}' closed on '{}'",
            self.context.connection,
            self.context.member.id,
            self.context.room
        );
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        if !self.subscribed {
            return;
        }
        let broadcast = self.usecase.broadcast.clone();
        let topic = self.context.topic();
        let connection = self.context.connection;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    broadcast.unsubscribe(&topic, &connection).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    "Connection '{}' dropped outside a runtime; subscription will be pruned on next publish",
                    connection
                );
            }
        }
    }
}
