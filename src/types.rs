use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::ServerMessage;

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type PromptId = String;
pub type ConnectionId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Answering,
    Intermission,
    Quizzing,
    Reveal,
    Final,
}

impl GamePhase {
    /// 1-based phase number as shown by clients
    pub fn number(self) -> u8 {
        match self {
            GamePhase::Answering => 1,
            GamePhase::Intermission => 2,
            GamePhase::Quizzing => 3,
            GamePhase::Reveal => 4,
            GamePhase::Final => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub answering_seconds: u32,
    pub quiz_seconds: u32,
    pub leaderboard_size: usize,
    /// Upper bound on random draws when looking for a free room code
    pub max_code_attempts: u32,
    pub max_name_chars: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            answering_seconds: 300,
            quiz_seconds: 15,
            leaderboard_size: 5,
            max_code_attempts: 64,
            max_name_chars: 32,
        }
    }
}

impl GameConfig {
    pub fn quiz_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.quiz_seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
}

/// Which of a player's two prompts an answer belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSlot {
    First,
    Second,
}

impl AnswerSlot {
    pub fn index(self) -> usize {
        match self {
            AnswerSlot::First => 0,
            AnswerSlot::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerRef {
    pub player_id: PlayerId,
    pub slot: AnswerSlot,
}

/// A prompt bound to the two players who answered it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptAssignment {
    pub prompt: Prompt,
    pub answerers: [AnswerRef; 2],
}

#[derive(Debug, Clone)]
pub struct Guess {
    pub answers: [String; 2],
    /// Time between round start and submission
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub prompts: Option<[Prompt; 2]>,
    pub answers: [Option<String>; 2],
    pub guess: Option<Guess>,
    /// Undefined until the first correct guess
    pub score: Option<f64>,
    pub connected: bool,
}

impl Player {
    pub fn new(name: String) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name,
            prompts: None,
            answers: [None, None],
            guess: None,
            score: None,
            connected: true,
        }
    }

    pub fn has_answered(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: f64,
}

/// Who a room event is meant for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Everyone,
    Host,
    Players,
    Player(PlayerId),
}

#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub to: Recipient,
    pub message: ServerMessage,
}

/// What a connection is inside a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Host,
    Player(PlayerId),
}

impl Recipient {
    pub fn includes(&self, role: &Role) -> bool {
        match (self, role) {
            (Recipient::Everyone, _) => true,
            (Recipient::Host, Role::Host) => true,
            (Recipient::Players, Role::Player(_)) => true,
            (Recipient::Player(target), Role::Player(id)) => target == id,
            _ => false,
        }
    }
}

/// A connection's place in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInRoom {
    pub code: RoomCode,
    pub role: Role,
}
