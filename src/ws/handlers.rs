//! WebSocket message dispatch
//!
//! Membership is checked here, then dispatched to role-specific handler modules.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{Role, RoleInRoom};
use std::sync::Arc;

use super::{host, player, Connection};

/// Resolve the host's room code or return an error response early
macro_rules! check_host {
    ($conn:expr, $action:expr) => {
        match &$conn.membership {
            Some(RoleInRoom {
                code,
                role: Role::Host,
            }) => code.clone(),
            Some(_) => return Some(GameError::Unauthorized($action).to_message()),
            None => return Some(GameError::NotInRoom.to_message()),
        }
    };
}

/// Resolve `(room code, player id)` or return an error response early
macro_rules! check_player {
    ($conn:expr, $action:expr) => {
        match &$conn.membership {
            Some(RoleInRoom {
                code,
                role: Role::Player(player_id),
            }) => (code.clone(), player_id.clone()),
            Some(_) => return Some(GameError::Unauthorized($action).to_message()),
            None => return Some(GameError::NotInRoom.to_message()),
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::RequestRoom => host::handle_request_room(state, conn).await,

        ClientMessage::JoinRoom { code, name } => {
            player::handle_join_room(state, conn, code, name).await
        }

        // Host-only commands
        ClientMessage::StartGame { code } => {
            let room = check_host!(conn, "start the game");
            host::handle_start_game(state, &conn.id, room, code).await
        }

        ClientMessage::AdvancePhase => {
            let room = check_host!(conn, "advance the game");
            host::handle_advance_phase(state, &conn.id, room).await
        }

        // Player commands
        ClientMessage::SubmitAnswers { answer1, answer2 } => {
            let (room, player_id) = check_player!(conn, "submit answers");
            player::handle_submit_answers(state, room, player_id, answer1, answer2).await
        }

        ClientMessage::SubmitGuess { answers } => {
            let (room, player_id) = check_player!(conn, "submit guesses");
            player::handle_submit_guess(state, room, player_id, answers).await
        }
    }
}

/// Detach a closed connection from its room
pub async fn handle_disconnect(conn: &Connection, state: &Arc<AppState>) {
    if let Some(RoleInRoom { code, role }) = &conn.membership {
        state.remove_member(code, &conn.id, role).await;
    }
}

/// Turn a failed command into the reply for the originating connection.
/// Commands for rooms that vanished underneath the connection are dropped.
pub(super) fn error_response(error: GameError) -> Option<ServerMessage> {
    match error {
        GameError::StaleSessionReference(code) => {
            tracing::warn!("Ignoring command for vanished room {}", code);
            None
        }
        e => {
            tracing::debug!("Command rejected: {}", e);
            Some(e.to_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_code(msg: Option<ServerMessage>) -> String {
        match msg {
            Some(ServerMessage::Error { code, .. }) => code,
            other => panic!("Expected Error message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_command_before_joining() {
        let state = Arc::new(AppState::new());
        let mut conn = Connection::new();

        let result = handle_message(ClientMessage::AdvancePhase, &mut conn, &state).await;
        assert_eq!(error_code(result), "NOT_IN_ROOM");

        let result = handle_message(
            ClientMessage::SubmitAnswers {
                answer1: "a".to_string(),
                answer2: "b".to_string(),
            },
            &mut conn,
            &state,
        )
        .await;
        assert_eq!(error_code(result), "NOT_IN_ROOM");
    }

    #[tokio::test]
    async fn test_host_cannot_submit_answers() {
        let state = Arc::new(AppState::new());
        let mut conn = Connection::new();
        handle_message(ClientMessage::RequestRoom, &mut conn, &state).await;

        let result = handle_message(
            ClientMessage::SubmitGuess {
                answers: ["a".to_string(), "b".to_string()],
            },
            &mut conn,
            &state,
        )
        .await;
        assert_eq!(error_code(result), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_disconnect_of_host_alone_destroys_room() {
        let state = Arc::new(AppState::new());
        let mut conn = Connection::new();
        let code = match handle_message(ClientMessage::RequestRoom, &mut conn, &state).await {
            Some(ServerMessage::RoomCreated { code }) => code,
            other => panic!("Expected RoomCreated, got {:?}", other),
        };

        handle_disconnect(&conn, &state).await;
        assert!(state.get_session(&code).await.is_none());
    }

    #[test]
    fn test_stale_errors_are_silent() {
        assert!(error_response(GameError::StaleSessionReference("ABCD".to_string())).is_none());
        assert!(error_response(GameError::InvalidGuesser).is_some());
    }
}
