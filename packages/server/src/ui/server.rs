//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::usecase::{
    GetRoomHistoryUseCase, GetRoomStateUseCase, LobbySessionUseCase, RoomSessionUseCase,
};

use super::{
    handler::{
        debug_room_state, get_room_history, get_rooms, health_check, lobby_websocket_handler,
        room_websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Build the application router
///
/// Exposed separately from [`Server`] so tests can serve it on an ephemeral port.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws/chat/{room_name}", get(room_websocket_handler))
        .route("/ws/lobby", get(lobby_websocket_handler))
        // HTTP エンドポイント
        .route("/debug/rooms/{room_name}", get(debug_room_state))
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{room_name}/messages", get(get_room_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Lounge chat server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     room_session_usecase,
///     lobby_session_usecase,
///     get_room_history_usecase,
///     get_room_state_usecase,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    room_session_usecase: Arc<RoomSessionUseCase>,
    lobby_session_usecase: Arc<LobbySessionUseCase>,
    get_room_history_usecase: Arc<GetRoomHistoryUseCase>,
    get_room_state_usecase: Arc<GetRoomStateUseCase>,
}

impl Server {
    pub fn new(
        room_session_usecase: Arc<RoomSessionUseCase>,
        lobby_session_usecase: Arc<LobbySessionUseCase>,
        get_room_history_usecase: Arc<GetRoomHistoryUseCase>,
        get_room_state_usecase: Arc<GetRoomStateUseCase>,
    ) -> Self {
        Self {
            room_session_usecase,
            lobby_session_usecase,
            get_room_history_usecase,
            get_room_state_usecase,
        }
    }

    /// Run the server until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app_state = Arc::new(AppState {
            room_session_usecase: self.room_session_usecase,
            lobby_session_usecase: self.lobby_session_usecase,
            get_room_history_usecase: self.get_room_history_usecase,
            get_room_state_usecase: self.get_room_state_usecase,
        });
        let app = router(app_state);

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Lounge server listening on {}", listener.local_addr()?);
        tracing::info!("Rooms:  ws://{}/ws/chat/{{room_name}}", bind_addr);
        tracing::info!("Lobby:  ws://{}/ws/lobby", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
