//! Player message handlers

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{PlayerId, Role, RoleInRoom, RoomCode};
use std::sync::Arc;

use super::handlers::error_response;
use super::Connection;

pub async fn handle_join_room(
    state: &Arc<AppState>,
    conn: &mut Connection,
    code: RoomCode,
    name: String,
) -> Option<ServerMessage> {
    tracing::info!("Join request for room {} as {}", code, name);
    if let Some(membership) = &conn.membership {
        return error_response(GameError::AlreadyInRoom(membership.code.clone()));
    }

    match state.join_session(&code, &name, &conn.id).await {
        Ok(joined) => {
            conn.membership = Some(RoleInRoom {
                code: joined.code.clone(),
                role: Role::Player(joined.player.id),
            });
            conn.events = Some(joined.events);
            Some(ServerMessage::JoinAccepted {
                code: joined.code,
                players: joined.roster,
            })
        }
        Err(GameError::RoomNotFound(_)) => Some(ServerMessage::RoomNotFound { code }),
        Err(e) => error_response(e),
    }
}

pub async fn handle_submit_answers(
    state: &Arc<AppState>,
    room: RoomCode,
    player_id: PlayerId,
    answer1: String,
    answer2: String,
) -> Option<ServerMessage> {
    match state
        .submit_answers(&room, &player_id, answer1, answer2)
        .await
    {
        Ok(()) => None,
        Err(e) => error_response(e),
    }
}

pub async fn handle_submit_guess(
    state: &Arc<AppState>,
    room: RoomCode,
    player_id: PlayerId,
    answers: [String; 2],
) -> Option<ServerMessage> {
    match state.submit_guess(&room, &player_id, answers).await {
        Ok(()) => None,
        Err(e) => error_response(e),
    }
}
