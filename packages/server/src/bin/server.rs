//! Lounge chat server: room presence and broadcast coordinator.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lounge-server
//! cargo run --bin lounge-server -- --host 0.0.0.0 --port 3000 --profile alice=/media/alice.png
//! ```

use std::sync::Arc;

use clap::Parser;
use lounge_server::{
    config::{Args, ServerConfig},
    domain::PresenceTracker,
    infrastructure::{
        broadcast::InProcessBroadcastGroup,
        profile::InMemoryProfileDirectory,
        repository::{InMemoryMessageStore, InMemoryRoomRegistry},
    },
    ui::Server,
    usecase::{
        GetRoomHistoryUseCase, GetRoomStateUseCase, LobbySessionUseCase, RoomSessionUseCase,
    },
};
use lounge_shared::{logger::setup_logger, time::SystemClock};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match ServerConfig::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize dependencies in order:
    // 1. Registry / Store / Profiles / Broadcast
    // 2. PresenceTracker
    // 3. UseCases
    // 4. Server
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(InMemoryRoomRegistry::new(clock.clone()));
    let store = Arc::new(InMemoryMessageStore::new(clock));
    tracing::info!("Loaded {} profile(s)", config.profiles.len());
    let profiles = Arc::new(InMemoryProfileDirectory::new(config.profiles));
    let broadcast = Arc::new(InProcessBroadcastGroup::new());

    let tracker = Arc::new(PresenceTracker::new(
        registry.clone(),
        profiles,
        config.default_avatar,
    ));

    let room_session_usecase = Arc::new(RoomSessionUseCase::new(
        store.clone(),
        broadcast.clone(),
        tracker,
    ));
    let lobby_session_usecase = Arc::new(LobbySessionUseCase::new(
        store.clone(),
        registry.clone(),
        broadcast,
    ));
    let get_room_history_usecase = Arc::new(GetRoomHistoryUseCase::new(store, registry.clone()));
    let get_room_state_usecase = Arc::new(GetRoomStateUseCase::new(registry));

    let server = Server::new(
        room_session_usecase,
        lobby_session_usecase,
        get_room_history_usecase,
        get_room_state_usecase,
    );
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
