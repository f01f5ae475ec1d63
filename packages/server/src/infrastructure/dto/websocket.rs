//! WebSocket frame DTOs.
//!
//! Field names follow the wire format existing clients speak: `entrou` carries
//! both join and leave announcements, `num_users` carries the roster list, and
//! the lobby feed is keyed by `salas`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{MessageContent, ProtocolError, RoomCommand};

/// Key whose presence (regardless of value) marks an explicit leave.
pub const LEAVE_KEY: &str = "sair";
/// Key carrying chat text.
pub const MESSAGE_KEY: &str = "message";

/// Decode an inbound room channel frame.
///
/// `{"sair": <anything>}` is a leave, `{"message": "<text>"}` is chat.
pub fn parse_room_frame(text: &str) -> Result<RoomCommand, ProtocolError> {
    let frame: Map<String, Value> =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    if frame.contains_key(LEAVE_KEY) {
        return Ok(RoomCommand::Leave);
    }

    match frame.get(MESSAGE_KEY) {
        Some(Value::String(content)) => Ok(RoomCommand::Chat(MessageContent::new(content.clone())?)),
        Some(other) => Err(ProtocolError::Malformed(format!(
            "'message' must be a string, got {other}"
        ))),
        None => Err(ProtocolError::UnknownFrame),
    }
}

/// Chat message relayed to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub message: String,
    pub user_id: String,
    pub user_name: String,
    pub user_profile: String,
}

/// One roster entry inside a presence notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntryFrame {
    pub id: String,
    pub username: String,
    pub image: String,
}

/// Join or leave notice with the post-change roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceNoticeFrame {
    pub entrou: String,
    pub num_users: Vec<RosterEntryFrame>,
}

/// One room in the lobby feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCountFrame {
    pub name: String,
    pub users: usize,
}

/// Lobby feed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyFrame {
    pub salas: Vec<RoomCountFrame>,
}

/// Failure reported to the sending client only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Any frame the server sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    Chat(ChatFrame),
    Notice(PresenceNoticeFrame),
    Lobby(LobbyFrame),
    Error(ErrorFrame),
}

impl OutboundFrame {
    pub fn error(message: impl Into<String>) -> Self {
        OutboundFrame::Error(ErrorFrame {
            error: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValueObjectError;

    #[test]
    fn test_parse_chat_frame() {
        // テスト項目: message キーを持つフレームはチャットとして解釈される
        // given (前提条件):
        let text = r#"{"message": "hi"}"#;

        // when (操作):
        let command = parse_room_frame(text);

        // then (期待する結果):
        assert_eq!(
            command,
            Ok(RoomCommand::Chat(MessageContent::new("hi".to_string()).unwrap()))
        );
    }

    #[test]
    fn test_parse_leave_frame_by_key_presence() {
        // テスト項目: sair キーがあれば値に関係なく退出として解釈される
        // given (前提条件):
        let frames = [
            r#"{"sair": true}"#,
            r#"{"sair": false}"#,
            r#"{"sair": null}"#,
            r#"{"sair": 1, "message": "bye"}"#,
        ];

        for text in frames {
            // when (操作):
            let command = parse_room_frame(text);

            // then (期待する結果):
            assert_eq!(command, Ok(RoomCommand::Leave), "frame: {text}");
        }
    }

    #[test]
    fn test_parse_rejects_non_object() {
        // テスト項目: JSON オブジェクトでないフレームはエラーになる
        // given (前提条件):
        let text = "hello";

        // when (操作):
        let command = parse_room_frame(text);

        // then (期待する結果):
        assert!(matches!(command, Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        // テスト項目: message も sair も持たないフレームはエラーになる
        // given (前提条件):
        let text = r#"{"type": "chat"}"#;

        // when (操作):
        let command = parse_room_frame(text);

        // then (期待する結果):
        assert_eq!(command, Err(ProtocolError::UnknownFrame));
    }

    #[test]
    fn test_parse_rejects_empty_message() {
        // テスト項目: 空のメッセージはエラーになる
        // given (前提条件):
        let text = r#"{"message": ""}"#;

        // when (操作):
        let command = parse_room_frame(text);

        // then (期待する結果):
        assert_eq!(
            command,
            Err(ProtocolError::InvalidMessage(ValueObjectError::Empty("message")))
        );
    }

    #[test]
    fn test_notice_frame_wire_shape() {
        // テスト項目: 参加通知は entrou と num_users のキーで送られる
        // given (前提条件):
        let frame = OutboundFrame::Notice(PresenceNoticeFrame {
            entrou: "alice joined the room".to_string(),
            num_users: vec![RosterEntryFrame {
                id: "1".to_string(),
                username: "alice".to_string(),
                image: "/media/default.jpg".to_string(),
            }],
        });

        // when (操作):
        let json: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({
                "entrou": "alice joined the room",
                "num_users": [{"id": "1", "username": "alice", "image": "/media/default.jpg"}]
            })
        );
    }
}
