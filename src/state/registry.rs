use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::broadcast;

use super::session::{Session, SessionHandle};
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

const CODE_LENGTH: usize = 4;

/// What a successful join hands back to the connection
pub struct JoinedRoom {
    pub code: RoomCode,
    pub player: Player,
    /// Names in the room before the joiner
    pub roster: Vec<String>,
    pub events: broadcast::Receiver<RoomEvent>,
}

/// Public snapshot of a room
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub started: bool,
    pub players: Vec<String>,
}

/// Random code of uppercase ASCII letters
pub fn generate_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    (0..CODE_LENGTH)
        .map(|_| char::from(b'A' + rng.random_range(0..26u8)))
        .collect()
}

/// Draw codes until one is free, giving up after `max_attempts`
pub fn generate_unique_code<R, F>(rng: &mut R, max_attempts: u32, taken: F) -> Option<RoomCode>
where
    R: Rng,
    F: Fn(&str) -> bool,
{
    (0..max_attempts)
        .map(|_| generate_room_code(rng))
        .find(|code| !taken(code))
}

/// Codes are typed by hand, so accept lowercase and stray whitespace
pub fn normalize_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

impl AppState {
    /// Open a fresh room owned by `host` and subscribe the host to it
    pub async fn create_session(
        &self,
        host: &ConnectionId,
    ) -> GameResult<(RoomCode, broadcast::Receiver<RoomEvent>)> {
        let max_attempts = self.config.max_code_attempts;
        let (code, events) = {
            let mut sessions = self.sessions.write().await;
            let code = generate_unique_code(&mut rand::rng(), max_attempts, |c| {
                sessions.contains_key(c)
            })
            .ok_or(GameError::CodeSpaceExhausted(max_attempts))?;

            let handle = Session::new_handle(code.clone(), host.clone(), self.config.clone());
            let events = handle.lock().await.subscribe();
            sessions.insert(code.clone(), handle);
            self.members
                .write()
                .await
                .insert(code.clone(), HashSet::from([host.clone()]));
            (code, events)
        };

        tracing::info!("Room {} created by connection {}", code, host);
        Ok((code, events))
    }

    pub async fn get_session(&self, code: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(code).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Add a named player to an open room
    pub async fn join_session(
        &self,
        code: &str,
        name: &str,
        connection: &ConnectionId,
    ) -> GameResult<JoinedRoom> {
        let code = normalize_code(code);
        let handle = self
            .get_session(&code)
            .await
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
        let name = self.validate_name(name)?;

        let (player, roster, events) = {
            let mut session = handle.lock().await;
            if session.closed {
                return Err(GameError::RoomNotFound(code));
            }
            if session.started {
                return Err(GameError::GameAlreadyStarted(code));
            }
            // Under the room lock, so a concurrent teardown either sees this
            // member or has already removed the room
            self.add_member(&code, connection).await?;

            let roster = session.roster();
            let player = session.add_player(name)?;
            // Subscribe first so the joiner sees its own announcement
            let events = session.subscribe();
            session.emit(
                Recipient::Everyone,
                ServerMessage::PlayerJoined {
                    name: player.name.clone(),
                },
            );
            (player, roster, events)
        };

        tracing::info!("Player {} joined room {}", player.name, code);
        Ok(JoinedRoom {
            code,
            player,
            roster,
            events,
        })
    }

    fn validate_name(&self, name: &str) -> GameResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::InvalidName("Name cannot be empty".to_string()));
        }
        if name.chars().count() > self.config.max_name_chars {
            return Err(GameError::InvalidName(format!(
                "Name cannot be longer than {} characters",
                self.config.max_name_chars
            )));
        }
        Ok(name.to_string())
    }

    /// Attach a connection to a live room. Rooms that were already torn down
    /// are not brought back.
    pub async fn add_member(&self, code: &str, connection: &ConnectionId) -> GameResult<()> {
        match self.members.write().await.get_mut(code) {
            Some(set) => {
                set.insert(connection.clone());
                Ok(())
            }
            None => Err(GameError::RoomNotFound(code.to_string())),
        }
    }

    /// Forget a connection. A departing player is marked disconnected; the
    /// last member leaving empties the room.
    pub async fn remove_member(&self, code: &str, connection: &ConnectionId, role: &Role) {
        if let Role::Player(player_id) = role {
            if let Some(handle) = self.get_session(code).await {
                handle.lock().await.player_left(player_id);
            }
        }

        let emptied = {
            let mut members = self.members.write().await;
            match members.get_mut(code) {
                Some(set) => {
                    set.remove(connection);
                    set.is_empty()
                }
                None => false,
            }
        };

        if emptied {
            self.session_emptied(code).await;
        }
    }

    pub async fn member_count(&self, code: &str) -> usize {
        self.members
            .read()
            .await
            .get(code)
            .map_or(0, HashSet::len)
    }

    pub async fn session_emptied(&self, code: &str) {
        tracing::info!("Room {} is empty", code);
        self.destroy_session(code).await;
    }

    /// Cancel the room's countdown and release its code. Returns whether a room
    /// was actually removed.
    pub async fn destroy_session(&self, code: &str) -> bool {
        let removed = self.sessions.write().await.remove(code);
        self.members.write().await.remove(code);

        match removed {
            Some(handle) => {
                handle.lock().await.close();
                tracing::info!("Room {} was deleted", code);
                true
            }
            None => false,
        }
    }

    pub async fn room_info(&self, code: &str) -> Option<RoomInfo> {
        let handle = self.get_session(&normalize_code(code)).await?;
        let session = handle.lock().await;
        Some(RoomInfo {
            code: session.code.clone(),
            phase: session.phase,
            started: session.started,
            players: session.roster(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn conn(id: &str) -> ConnectionId {
        id.to_string()
    }

    #[test]
    fn test_room_code_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_unique_code_gives_up() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(generate_unique_code(&mut rng, 10, |_| true), None);
        assert!(generate_unique_code(&mut rng, 10, |_| false).is_some());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" abcd "), "ABCD");
    }

    #[tokio::test]
    async fn test_create_session() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();

        let info = state.room_info(&code).await.unwrap();
        assert_eq!(info.phase, GamePhase::Answering);
        assert!(!info.started);
        assert!(info.players.is_empty());
        assert_eq!(state.member_count(&code).await, 1);
    }

    #[tokio::test]
    async fn test_code_space_exhausted() {
        let state = AppState::with_config(GameConfig {
            max_code_attempts: 0,
            ..GameConfig::default()
        });

        let result = state.create_session(&conn("host")).await;
        assert!(matches!(result, Err(GameError::CodeSpaceExhausted(0))));
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_session() {
        let state = AppState::new();
        let (code, mut host_rx) = state.create_session(&conn("host")).await.unwrap();

        let first = state.join_session(&code, "Ann", &conn("a")).await.unwrap();
        assert!(first.roster.is_empty());

        let mut second = state
            .join_session(&code.to_lowercase(), "  Ben ", &conn("b"))
            .await
            .unwrap();
        assert_eq!(second.roster, vec!["Ann"]);
        assert_eq!(second.player.name, "Ben");

        // Joiner hears its own announcement
        let event = second.events.recv().await.unwrap();
        assert_eq!(
            event.message,
            ServerMessage::PlayerJoined {
                name: "Ben".to_string()
            }
        );

        let event = host_rx.recv().await.unwrap();
        assert_eq!(
            event.message,
            ServerMessage::PlayerJoined {
                name: "Ann".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let state = AppState::new();
        let result = state.join_session("ZZZZ", "Ann", &conn("a")).await;

        assert!(matches!(result, Err(GameError::RoomNotFound(code)) if code == "ZZZZ"));
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_rejects_bad_names() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();

        let result = state.join_session(&code, "   ", &conn("a")).await;
        assert!(matches!(result, Err(GameError::InvalidName(_))));

        let long = "x".repeat(33);
        let result = state.join_session(&code, &long, &conn("a")).await;
        assert!(matches!(result, Err(GameError::InvalidName(_))));

        assert!(state.room_info(&code).await.unwrap().players.is_empty());
    }

    #[tokio::test]
    async fn test_last_member_leaving_destroys_room() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();
        let joined = state.join_session(&code, "Ann", &conn("a")).await.unwrap();

        state
            .remove_member(&code, &conn("host"), &Role::Host)
            .await;
        assert!(state.get_session(&code).await.is_some());

        let handle = state.get_session(&code).await.unwrap();
        state
            .remove_member(&code, &conn("a"), &Role::Player(joined.player.id.clone()))
            .await;

        assert!(state.get_session(&code).await.is_none());
        let session = handle.lock().await;
        assert!(session.closed);
        assert!(!session.players[0].connected);
    }

    #[tokio::test]
    async fn test_no_membership_for_destroyed_room() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();
        state.destroy_session(&code).await;

        let result = state.add_member(&code, &conn("a")).await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));
        let result = state.join_session(&code, "Ann", &conn("a")).await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));

        assert!(!state.members.read().await.contains_key(&code));
        assert_eq!(state.member_count(&code).await, 0);
    }

    #[tokio::test]
    async fn test_join_while_room_torn_down() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();
        let handle = state.get_session(&code).await.unwrap();

        // Membership entry already gone while the room is still reachable
        state.members.write().await.remove(&code);

        let result = state.join_session(&code, "Ann", &conn("a")).await;
        assert!(matches!(result, Err(GameError::RoomNotFound(_))));
        assert!(!state.members.read().await.contains_key(&code));
        assert!(handle.lock().await.players.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_session_idempotent() {
        let state = AppState::new();
        let (code, _rx) = state.create_session(&conn("host")).await.unwrap();

        assert!(state.destroy_session(&code).await);
        assert!(!state.destroy_session(&code).await);
        assert!(state.room_info(&code).await.is_none());
    }
}
