//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{ProtocolError, StorageError};

/// ルームセッションの 1 フレーム処理で起きたエラー
///
/// どちらもセッションを壊しません。呼び出し側（UI 層）が、クライアントへの通知や
/// 接続のクローズといった方針を決めます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 永続化に失敗したため、メッセージは配信されていない
    #[error("message could not be saved: {0}")]
    Storage(#[from] StorageError),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
}
