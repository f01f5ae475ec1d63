//! UseCase 層
//!
//! ルーム・ロビーの接続セッションと、HTTP API 向けの参照系ユースケースを提供します。

pub mod error;
pub mod lobby_session;
pub mod room_history;
pub mod room_session;

pub use error::SessionError;
pub use lobby_session::{LobbySession, LobbySessionUseCase};
pub use room_history::{GetRoomHistoryUseCase, GetRoomStateUseCase};
pub use room_session::{
    RoomSession, RoomSessionState, RoomSessionUseCase, SessionContext, SessionStep,
};
