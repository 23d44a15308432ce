use super::session::Session;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::state::assign::{AssignError, MIN_PLAYERS};
use crate::types::*;

impl AppState {
    /// Run a command on a room a connection believes it belongs to. A room
    /// that is already closed is stale; a room the command leaves closed
    /// (broken invariant) is released from the registry.
    async fn with_open_session<T>(
        &self,
        code: &str,
        command: impl FnOnce(&mut Session) -> GameResult<T>,
    ) -> GameResult<T> {
        let handle = self
            .get_session(code)
            .await
            .ok_or_else(|| GameError::StaleSessionReference(code.to_string()))?;

        let (result, broken) = {
            let mut session = handle.lock().await;
            if session.closed {
                return Err(GameError::StaleSessionReference(code.to_string()));
            }
            let result = command(&mut *session);
            (result, session.closed)
        };

        if broken {
            tracing::error!("Room {} closed after an internal error", code);
            self.destroy_session(code).await;
        }
        result
    }

    /// Fetch prompts, assign them and open the Answering phase. The session
    /// stays locked across the fetch so a second start cannot interleave.
    pub async fn start_game(&self, code: &str, connection: &ConnectionId) -> GameResult<()> {
        let handle = self
            .get_session(code)
            .await
            .ok_or_else(|| GameError::RoomNotFound(code.to_string()))?;
        let mut session = handle.lock().await;

        if session.closed {
            return Err(GameError::StaleSessionReference(code.to_string()));
        }
        if session.host != *connection {
            return Err(GameError::Unauthorized("start the game"));
        }
        if session.started {
            return Err(GameError::GameAlreadyStarted(session.code.clone()));
        }
        if session.players.len() < MIN_PLAYERS {
            return Err(AssignError::TooFewPlayers(session.players.len()).into());
        }

        let prompts = self.prompts.fetch_prompts().await.map_err(|e| {
            tracing::warn!(
                "Prompt repository {} failed for room {}: {}",
                self.prompts.name(),
                code,
                e
            );
            GameError::from(e)
        })?;

        let mut rng = rand::rng();
        session.begin_answering(prompts, &mut rng)
    }

    pub async fn advance_phase(&self, code: &str, connection: &ConnectionId) -> GameResult<()> {
        self.with_open_session(code, |session| {
            if session.host != *connection {
                return Err(GameError::Unauthorized("advance the game"));
            }
            let mut rng = rand::rng();
            session.advance(&mut rng)
        })
        .await
    }

    pub async fn submit_answers(
        &self,
        code: &str,
        player_id: &str,
        answer1: String,
        answer2: String,
    ) -> GameResult<()> {
        self.with_open_session(code, |session| {
            session.submit_answers(player_id, answer1, answer2)
        })
        .await
    }

    pub async fn submit_guess(
        &self,
        code: &str,
        player_id: &str,
        answers: [String; 2],
    ) -> GameResult<()> {
        self.with_open_session(code, |session| session.submit_guess(player_id, answers))
            .await
    }
}
