//! Per-room game state
//!
//! A `Session` is only ever touched through its `SessionHandle` mutex, so every
//! command and every countdown tick runs to completion before the next one.

use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;

use super::scheduler::Countdown;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;

pub type SessionHandle = Arc<Mutex<Session>>;

/// The round currently being guessed (kept through Reveal)
#[derive(Debug, Clone)]
pub struct ActiveRound {
    pub assignment: PromptAssignment,
    pub subjects: [PlayerId; 2],
    pub subject_names: [String; 2],
    pub true_answers: [String; 2],
    /// `true_answers`, possibly swapped
    pub candidate_answers: [String; 2],
}

pub struct Session {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub started: bool,
    pub host: ConnectionId,
    pub players: Vec<Player>,
    /// Assignments not yet played
    pub quiz_pool: Vec<PromptAssignment>,
    pub total_rounds: usize,
    pub active_round: Option<ActiveRound>,
    pub round_started_at: Option<Instant>,
    pub config: GameConfig,
    /// Set once the room is destroyed; late timer ticks check this
    pub closed: bool,
    pub(super) countdown: Option<Countdown>,
    pub(super) countdown_epoch: u64,
    pub(super) this: Weak<Mutex<Session>>,
    events: broadcast::Sender<RoomEvent>,
}

impl Session {
    /// Create a session in the Answering phase (not yet started)
    pub fn new_handle(code: RoomCode, host: ConnectionId, config: GameConfig) -> SessionHandle {
        let (events, _rx) = broadcast::channel(256);
        Arc::new_cyclic(|this| {
            Mutex::new(Session {
                code,
                phase: GamePhase::Answering,
                started: false,
                host,
                players: Vec::new(),
                quiz_pool: Vec::new(),
                total_rounds: 0,
                active_round: None,
                round_started_at: None,
                config,
                closed: false,
                countdown: None,
                countdown_epoch: 0,
                this: this.clone(),
                events,
            })
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    /// Queue a message for the room's connections
    pub fn emit(&self, to: Recipient, message: ServerMessage) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.events.send(RoomEvent { to, message });
    }

    pub fn roster(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn add_player(&mut self, name: String) -> GameResult<Player> {
        if self.started {
            return Err(GameError::GameAlreadyStarted(self.code.clone()));
        }

        let player = Player::new(name);
        self.players.push(player.clone());
        Ok(player)
    }

    /// `(answered, total)` over all players
    pub fn answers_progress(&self) -> (usize, usize) {
        let answered = self.players.iter().filter(|p| p.has_answered()).count();
        (answered, self.players.len())
    }

    /// Every connected player has handed in both answers
    pub fn all_answered(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.connected)
            .all(Player::has_answered)
    }

    pub fn is_subject(&self, player_id: &str) -> bool {
        self.active_round
            .as_ref()
            .is_some_and(|round| round.subjects.iter().any(|s| s == player_id))
    }

    /// `(guessed, eligible)` over connected non-subject players
    pub fn guess_progress(&self) -> (usize, usize) {
        let eligible: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.connected && !self.is_subject(&p.id))
            .collect();
        let guessed = eligible.iter().filter(|p| p.guess.is_some()).count();
        (guessed, eligible.len())
    }

    pub fn all_guessed(&self) -> bool {
        let (guessed, eligible) = self.guess_progress();
        guessed == eligible
    }

    pub fn submit_answers(
        &mut self,
        player_id: &str,
        answer1: String,
        answer2: String,
    ) -> GameResult<()> {
        if !self.started || self.phase != GamePhase::Answering {
            return Err(GameError::InvalidPhase(self.phase));
        }

        let (answer1, answer2) = (answer1.trim().to_string(), answer2.trim().to_string());
        if answer1.is_empty() || answer2.is_empty() {
            return Err(GameError::InvalidAnswer(
                "Both answers are required".to_string(),
            ));
        }

        let player = self
            .player_mut(player_id)
            .ok_or(GameError::NotInRoom)?;
        player.answers = [Some(answer1), Some(answer2)];

        let (answered, total) = self.answers_progress();
        tracing::info!("Room {}: {}/{} players answered", self.code, answered, total);
        self.emit(
            Recipient::Host,
            ServerMessage::AnswersProgress { answered, total },
        );

        if self.all_answered() {
            self.finish_answering();
        }
        Ok(())
    }

    /// Record a guess for the active round. Subject players are refused without
    /// touching any state.
    pub fn submit_guess(&mut self, player_id: &str, answers: [String; 2]) -> GameResult<()> {
        if self.phase != GamePhase::Quizzing {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if self.is_subject(player_id) {
            return Err(GameError::InvalidGuesser);
        }

        let elapsed = self
            .round_started_at
            .map(|start| start.elapsed())
            .unwrap_or_default();
        let player = self
            .player_mut(player_id)
            .ok_or(GameError::NotInRoom)?;
        player.guess = Some(Guess { answers, elapsed });

        let (guessed, eligible) = self.guess_progress();
        self.emit(
            Recipient::Host,
            ServerMessage::AnswersProgress {
                answered: guessed,
                total: eligible,
            },
        );

        if self.all_guessed() {
            self.reveal_round();
        }
        Ok(())
    }

    /// A player's connection went away. Their record stays, but they no longer
    /// hold up completion of the current phase.
    pub fn player_left(&mut self, player_id: &str) {
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        player.connected = false;
        let name = player.name.clone();
        tracing::info!("Room {}: player {} disconnected", self.code, name);

        match self.phase {
            GamePhase::Answering if self.started && self.all_answered() => {
                self.finish_answering()
            }
            GamePhase::Quizzing if self.all_guessed() => self.reveal_round(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_players(names: &[&str]) -> SessionHandle {
        let handle = Session::new_handle(
            "ABCD".to_string(),
            "host".to_string(),
            GameConfig::default(),
        );
        {
            let mut session = handle.try_lock().unwrap();
            for name in names {
                session.add_player(name.to_string()).unwrap();
            }
        }
        handle
    }

    #[tokio::test]
    async fn test_new_session() {
        let handle = session_with_players(&[]);
        let session = handle.lock().await;

        assert_eq!(session.phase, GamePhase::Answering);
        assert!(!session.started);
        assert!(session.players.is_empty());
        assert!(session.countdown.is_none());
    }

    #[tokio::test]
    async fn test_roster_keeps_join_order() {
        let handle = session_with_players(&["Ann", "Ben", "Cat"]);
        let session = handle.lock().await;
        assert_eq!(session.roster(), vec!["Ann", "Ben", "Cat"]);
    }

    #[tokio::test]
    async fn test_add_player_after_start_fails() {
        let handle = session_with_players(&["Ann"]);
        let mut session = handle.lock().await;
        session.started = true;

        assert!(matches!(
            session.add_player("Late".to_string()),
            Err(GameError::GameAlreadyStarted(_))
        ));
        assert_eq!(session.players.len(), 1);
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let handle = session_with_players(&[]);
        let session = handle.lock().await;
        let mut rx = session.subscribe();

        session.emit(
            Recipient::Host,
            ServerMessage::TimeRemaining { seconds: 3 },
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.to, Recipient::Host);
        assert_eq!(event.message, ServerMessage::TimeRemaining { seconds: 3 });
    }

    #[tokio::test]
    async fn test_answers_rejected_before_start() {
        let handle = session_with_players(&["Ann"]);
        let mut session = handle.lock().await;
        let id = session.players[0].id.clone();

        let result = session.submit_answers(&id, "a".to_string(), "b".to_string());
        assert!(matches!(result, Err(GameError::InvalidPhase(GamePhase::Answering))));
        assert!(!session.players[0].has_answered());
    }

    #[tokio::test]
    async fn test_player_left_marks_disconnected() {
        let handle = session_with_players(&["Ann", "Ben"]);
        let mut session = handle.lock().await;
        let id = session.players[1].id.clone();

        session.player_left(&id);
        session.player_left("nobody");

        assert!(session.players[0].connected);
        assert!(!session.players[1].connected);
        assert_eq!(session.phase, GamePhase::Answering);
    }

    #[tokio::test]
    async fn test_disconnected_players_do_not_block_answers() {
        let handle = session_with_players(&["Ann", "Ben"]);
        let mut session = handle.lock().await;
        session.players[0].answers = [Some("x".to_string()), Some("y".to_string())];
        assert!(!session.all_answered());

        session.players[1].connected = false;
        assert!(session.all_answered());
        assert_eq!(session.answers_progress(), (1, 2));
    }
}
