pub mod admin;
pub mod handlers;
pub mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::PlayerSender;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{PlayerId, Role};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
    pub token: Option<String>,
}

/// One client connection as seen by the message handlers
#[derive(Debug, Clone)]
pub struct Connection {
    pub role: Role,
    /// Messages addressed to this connection's player
    pub outbox: PlayerSender,
}

impl Connection {
    pub fn new(role: Role, outbox: PlayerSender) -> Self {
        Self { role, outbox }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

pub(crate) fn parse_role(role: Option<&str>) -> Role {
    match role {
        Some("admin") => Role::Admin,
        Some("display") => Role::Display,
        _ => Role::Player,
    }
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let role = parse_role(params.role.as_deref());
    tracing::info!("WebSocket connected with role: {:?}", role);
    state.connection_opened(&role).await;

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role: role.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
        phase: state.session_phase().await,
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        state.connection_closed(&role).await;
        return;
    }

    // Everything for this client flows through one queue, in emission order
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel();
    let conn = Connection::new(role.clone(), outbox.clone());
    let connection_id = state.broadcaster.register(role.clone(), outbox.clone()).await;

    // A known token re-attaches the player right away
    let mut bound_player: Option<PlayerId> = None;
    if let (Role::Player, Some(token)) = (&role, params.token) {
        let response = player::handle_reconnect(&state, &conn, token).await;
        if let Some(ServerMessage::PlayerJoined { player_id, .. }) = &response {
            bound_player = Some(player_id.clone());
        }
        if let Some(msg) = response {
            if !send_json(&mut sender, &msg).await {
                if let Some(player_id) = &bound_player {
                    state.broadcaster.detach_player(player_id, &outbox).await;
                }
                state.broadcaster.unregister(&connection_id).await;
                state.connection_closed(&role).await;
                return;
            }
        }
    }

    loop {
        tokio::select! {
            Some(msg) = outbox_rx.recv() => {
                if !send_json(&mut sender, &msg).await {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &conn, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                ))
                            }
                        };

                        if let Some(response) = response {
                            if let ServerMessage::PlayerJoined { player_id, .. } = &response {
                                bound_player = Some(player_id.clone());
                            }
                            if !send_json(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(player_id) = bound_player {
        state.broadcaster.detach_player(&player_id, &outbox).await;
    }
    state.broadcaster.unregister(&connection_id).await;
    state.connection_closed(&role).await;
    tracing::info!("WebSocket connection closed for role: {:?}", role);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(Some("admin")), Role::Admin);
        assert_eq!(parse_role(Some("display")), Role::Display);
        assert_eq!(parse_role(Some("player")), Role::Player);
        assert_eq!(parse_role(Some("host")), Role::Player);
        assert_eq!(parse_role(None), Role::Player);
    }
}
