//! Host command handlers
//!
//! Host membership is checked in the dispatch layer before calling these.

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::registry::normalize_code;
use crate::state::AppState;
use crate::types::{ConnectionId, Role, RoleInRoom, RoomCode};
use std::sync::Arc;

use super::handlers::error_response;
use super::Connection;

pub async fn handle_request_room(
    state: &Arc<AppState>,
    conn: &mut Connection,
) -> Option<ServerMessage> {
    if let Some(membership) = &conn.membership {
        return error_response(GameError::AlreadyInRoom(membership.code.clone()));
    }

    match state.create_session(&conn.id).await {
        Ok((code, events)) => {
            conn.membership = Some(RoleInRoom {
                code: code.clone(),
                role: Role::Host,
            });
            conn.events = Some(events);
            Some(ServerMessage::RoomCreated { code })
        }
        Err(e) => {
            tracing::error!("Failed to create room: {}", e);
            error_response(e)
        }
    }
}

pub async fn handle_start_game(
    state: &Arc<AppState>,
    connection: &ConnectionId,
    room: RoomCode,
    requested: RoomCode,
) -> Option<ServerMessage> {
    tracing::info!("Host starting game in room {}", room);
    if normalize_code(&requested) != room {
        return error_response(GameError::Unauthorized("start another room's game"));
    }

    match state.start_game(&room, connection).await {
        Ok(()) => Some(ServerMessage::GameStartedAsHost),
        Err(e) => error_response(e),
    }
}

pub async fn handle_advance_phase(
    state: &Arc<AppState>,
    connection: &ConnectionId,
    room: RoomCode,
) -> Option<ServerMessage> {
    tracing::info!("Host advancing room {}", room);
    match state.advance_phase(&room, connection).await {
        Ok(()) => None,
        Err(e) => error_response(e),
    }
}
