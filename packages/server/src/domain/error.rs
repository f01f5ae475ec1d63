//! ドメイン層のエラー定義

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is too long ({actual} > {max} characters)")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("{0} contains an invalid character")]
    InvalidCharacter(&'static str),
}

/// Message Store への永続化エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("room '{0}' not found")]
    RoomNotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// プロフィール取得エラー
///
/// どちらの場合もロスター計算は中断されず、プレースホルダーに置き換えられます。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile for user '{0}' not found")]
    NotFound(String),

    #[error("profile lookup failed: {0}")]
    Unavailable(String),
}

/// クライアントから受信したフレームがプロトコルに反する
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("frame is not a JSON object: {0}")]
    Malformed(String),

    #[error("frame has neither 'message' nor 'sair'")]
    UnknownFrame,

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] ValueObjectError),

    #[error("session has not joined the room yet")]
    BeforeJoin,

    #[error("session already left the room")]
    AfterLeave,
}
