//! 値オブジェクト
//!
//! 生の文字列をそのまま扱わず、生成時にバリデーションを済ませた型として扱います。
//! 一度生成された値オブジェクトは不変で、常に妥当な値を保持します。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ルーム名の最大文字数
pub const ROOM_NAME_MAX_LEN: usize = 100;
/// ユーザー ID の最大文字数
pub const USER_ID_MAX_LEN: usize = 64;
/// 表示名の最大文字数
pub const DISPLAY_NAME_MAX_LEN: usize = 150;
/// メッセージ本文の最大文字数
pub const MESSAGE_CONTENT_MAX_LEN: usize = 4000;

fn validate_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ValueObjectError> {
    if value.trim().is_empty() {
        return Err(ValueObjectError::Empty(field));
    }
    validate_length(field, value, max_len)
}

fn validate_length(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ValueObjectError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(ValueObjectError::TooLong {
            field,
            max: max_len,
            actual: len,
        });
    }
    Ok(())
}

macro_rules! string_value_object {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// 文字列そのものへの参照を返す
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// 内部の `String` を取り出す
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValueObjectError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_value_object!(
    /// ルーム名（ユーザーが決める一意な名前）
    RoomName
);

impl RoomName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_text("room_name", &value, ROOM_NAME_MAX_LEN)?;
        if value.contains('/') || value.chars().any(char::is_control) {
            return Err(ValueObjectError::InvalidCharacter("room_name"));
        }
        Ok(Self(value))
    }
}

string_value_object!(
    /// ユーザー ID（認証済みの不透明で安定した識別子）
    UserId
);

impl UserId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_text("user_id", &value, USER_ID_MAX_LEN)?;
        Ok(Self(value))
    }
}

string_value_object!(
    /// 表示名
    DisplayName
);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_text("display_name", &value, DISPLAY_NAME_MAX_LEN)?;
        Ok(Self(value))
    }
}

string_value_object!(
    /// アバター画像への参照（URL やパス）
    AvatarRef
);

impl AvatarRef {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::Empty("avatar"));
        }
        Ok(Self(value))
    }
}

string_value_object!(
    /// チャットメッセージ本文
    ///
    /// 空文字列だけを拒否します。空白だけの本文は有効なメッセージです。
    MessageContent
);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::Empty("message"));
        }
        validate_length("message", &value, MESSAGE_CONTENT_MAX_LEN)?;
        Ok(Self(value))
    }
}

/// Unix タイムスタンプ（ミリ秒, UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// 接続ごとに払い出される ID
///
/// 同じユーザーが同じルームに複数接続していても、購読は接続単位で管理されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
