//! Shared application state.

use std::sync::Arc;

use crate::usecase::{
    GetRoomHistoryUseCase, GetRoomStateUseCase, LobbySessionUseCase, RoomSessionUseCase,
};

/// Shared application state
pub struct AppState {
    /// RoomSessionUseCase（ルーム接続セッションのユースケース）
    pub room_session_usecase: Arc<RoomSessionUseCase>,
    /// LobbySessionUseCase（ロビー接続セッションのユースケース）
    pub lobby_session_usecase: Arc<LobbySessionUseCase>,
    /// GetRoomHistoryUseCase（ルーム履歴取得のユースケース）
    pub get_room_history_usecase: Arc<GetRoomHistoryUseCase>,
    /// GetRoomStateUseCase（ルーム状態取得のユースケース）
    pub get_room_state_usecase: Arc<GetRoomStateUseCase>,
}
