pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{ConnectionId, RoleInRoom, RoomEvent};

/// Per-socket state: who this connection is and which room it listens to
pub struct Connection {
    pub id: ConnectionId,
    pub membership: Option<RoleInRoom>,
    pub events: Option<broadcast::Receiver<RoomEvent>>,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            membership: None,
            events: None,
        }
    }

    /// Whether a room event should be forwarded to this socket
    pub fn wants(&self, event: &RoomEvent) -> bool {
        self.membership
            .as_ref()
            .is_some_and(|m| event.to.includes(&m.role))
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut conn = Connection::new();

    tracing::info!("WebSocket connected: {}", conn.id);

    loop {
        tokio::select! {
            // Events of the room this connection belongs to
            room_event = async {
                match &mut conn.events {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending::<Result<RoomEvent, RecvError>>().await,
                }
            } => {
                match room_event {
                    Ok(event) if conn.wants(&event) => {
                        if let Ok(json) = serde_json::to_string(&event.message) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Connection {} lagged, skipped {} events", conn.id, skipped);
                    }
                    Err(RecvError::Closed) => {
                        // Room is gone
                        conn.events = None;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &mut conn, &state).await
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if let Ok(json) = serde_json::to_string(&response) {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
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

    handlers::handle_disconnect(&conn, &state).await;
    tracing::info!("WebSocket connection closed: {}", conn.id);
}
