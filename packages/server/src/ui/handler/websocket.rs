//! WebSocket connection handlers.
//!
//! Each connection runs two halves: a pusher task that owns the socket sink and
//! writes broadcast events plus frames addressed to this client only, and a
//! receive loop that feeds inbound frames into the session. Whichever half ends
//! first ends the connection, and the session is closed afterwards.
//!
//! A room connection subscribes to its topic before the upgrade response is
//! sent, so nothing published between the handshake and the join is lost.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Path, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    domain::{DisplayName, EventReceiver, Member, ProtocolError, RoomName, UserId},
    infrastructure::dto::websocket::{OutboundFrame, parse_room_frame},
    ui::state::AppState,
    usecase::{RoomSession, RoomSessionState, SessionContext, SessionError, SessionStep},
};

/// How long the pusher may keep flushing after the session is closed
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Identity of the connecting user, resolved upstream
#[derive(Debug, Deserialize)]
pub struct RoomConnectQuery {
    pub user_id: String,
    pub user_name: String,
}

/// Frames addressed to this connection only
enum Direct {
    Frame(OutboundFrame),
    Close { code: u16, reason: &'static str },
}

pub async fn room_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
    Query(query): Query<RoomConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let room = RoomName::try_from(room_name.clone()).map_err(|e| {
        tracing::warn!("Invalid room name '{}': {}", room_name, e);
        StatusCode::BAD_REQUEST
    })?;
    let user_id = UserId::try_from(query.user_id.clone()).map_err(|e| {
        tracing::warn!("Invalid user_id '{}': {}", query.user_id, e);
        StatusCode::BAD_REQUEST
    })?;
    let display_name = DisplayName::try_from(query.user_name).map_err(|e| {
        tracing::warn!("Invalid user_name for '{}': {}", user_id, e);
        StatusCode::BAD_REQUEST
    })?;

    let context = SessionContext::new(room, Member::new(user_id, display_name));
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    // If the upgrade fails the callback is dropped, and with it the session's subscription
    let session = state.room_session_usecase.accept(context, event_tx).await;

    Ok(ws
        .on_failed_upgrade(|e| tracing::warn!("WebSocket upgrade failed: {}", e))
        .on_upgrade(move |socket| handle_room_socket(socket, session, event_rx)))
}

pub async fn lobby_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_lobby_socket(socket, state))
}

/// Spawns the task that writes to this client's socket.
///
/// Broadcast events stop arriving once the session unsubscribes; the task keeps
/// running until the direct channel is closed or a write fails.
fn pusher_loop(
    mut events: EventReceiver,
    mut direct: mpsc::UnboundedReceiver<Direct>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events_open = true;
        loop {
            let outbound = tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => Direct::Frame(OutboundFrame::from(event.as_ref())),
                    None => {
                        events_open = false;
                        continue;
                    }
                },
                direct = direct.recv() => match direct {
                    Some(outbound) => outbound,
                    None => break,
                },
            };

            let message = match outbound {
                Direct::Frame(frame) => match frame.to_json() {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        tracing::error!("Failed to encode outbound frame: {}", e);
                        continue;
                    }
                },
                Direct::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    if let Err(e) = sender.send(Message::Close(Some(frame))).await {
                        tracing::debug!("Failed to send close frame: {}", e);
                    }
                    break;
                }
            };

            if sender.send(message).await.is_err() {
                break;
            }
        }
    })
}

/// Waits for the pusher to drain, aborting it if the peer stops reading
async fn finish_pusher(mut send_task: JoinHandle<()>) {
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }
}

async fn handle_room_socket(socket: WebSocket, mut session: RoomSession, event_rx: EventReceiver) {
    let (sender, mut receiver) = socket.split();
    let (direct_tx, direct_rx) = mpsc::unbounded_channel();

    let mut send_task = pusher_loop(event_rx, direct_rx, sender);
    session.open().await;

    let pusher_finished = tokio::select! {
        _ = room_receive_loop(&mut receiver, &mut session, &direct_tx) => false,
        _ = &mut send_task => {
            tracing::info!(
                "Lost connection to '{}' while sending",
                session.context().member.id
            );
            true
        }
    };

    session.close().await;
    drop(direct_tx);
    if !pusher_finished {
        finish_pusher(send_task).await;
    }
}

async fn room_receive_loop(
    receiver: &mut SplitStream<WebSocket>,
    session: &mut RoomSession,
    direct: &mpsc::UnboundedSender<Direct>,
) {
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
        };

        let outcome = match msg {
            Message::Text(_) | Message::Binary(_) if session.state() == RoomSessionState::Left => {
                Err(SessionError::Protocol(ProtocolError::AfterLeave))
            }
            Message::Text(text) => {
                tracing::debug!("Received text: {}", text.as_str());
                match parse_room_frame(text.as_str()) {
                    Ok(command) => session.handle(command).await,
                    Err(e) => Err(e.into()),
                }
            }
            Message::Binary(_) => Err(SessionError::Protocol(ProtocolError::Malformed(
                "binary frames are not supported".to_string(),
            ))),
            Message::Close(_) => {
                tracing::info!(
                    "Client '{}' requested close",
                    session.context().member.id
                );
                break;
            }
            // Ping/pong is handled automatically by the WebSocket protocol
            _ => continue,
        };

        match outcome {
            Ok(SessionStep::Continue) => {}
            Ok(SessionStep::Left) => {
                tracing::debug!(
                    "'{}' left '{}', keeping the connection until the client closes it",
                    session.context().member.id,
                    session.context().room
                );
            }
            Err(SessionError::Protocol(ProtocolError::AfterLeave)) => {
                tracing::warn!(
                    "Protocol violation by '{}': traffic after leave, closing",
                    session.context().member.id
                );
                let _ = direct.send(Direct::Close {
                    code: close_code::POLICY,
                    reason: "traffic after leave",
                });
                break;
            }
            Err(e) => {
                tracing::warn!("Rejected frame from '{}': {}", session.context().member.id, e);
                let _ = direct.send(Direct::Frame(OutboundFrame::error(e.to_string())));
            }
        }
    }
}

async fn handle_lobby_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (direct_tx, direct_rx) = mpsc::unbounded_channel::<Direct>();

    let mut send_task = pusher_loop(event_rx, direct_rx, sender);
    let session = state.lobby_session_usecase.open(event_tx).await;
    let connection = session.connection();

    // ロビーは送信専用。受信したフレームは読み捨てる
    let lobby_receive = async {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(other) => tracing::debug!("Ignoring lobby frame: {:?}", other),
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    };

    let pusher_finished = tokio::select! {
        _ = lobby_receive => false,
        _ = &mut send_task => {
            tracing::info!("Lost lobby connection '{}' while sending", connection);
            true
        }
    };

    session.close().await;
    drop(direct_tx);
    if !pusher_finished {
        finish_pusher(send_task).await;
    }
}
