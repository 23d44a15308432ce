//! Errors surfaced by the session engine
//!
//! Every variant maps to a stable wire code so that handlers can report it to
//! the originating connection as a `ServerMessage::Error`.

use crate::prompts::PromptError;
use crate::protocol::ServerMessage;
use crate::state::assign::AssignError;
use crate::types::{GamePhase, RoomCode};

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("Prompt repository unavailable: {0}")]
    RepositoryUnavailable(#[from] PromptError),

    #[error("Session {0} no longer exists")]
    StaleSessionReference(RoomCode),

    #[error("Players cannot guess a round about their own answers")]
    InvalidGuesser,

    #[error("Connection is not allowed to {0}")]
    Unauthorized(&'static str),

    #[error("Not allowed during {0:?}")]
    InvalidPhase(GamePhase),

    #[error("Connection has not joined a room")]
    NotInRoom,

    #[error("Connection already belongs to room {0}")]
    AlreadyInRoom(RoomCode),

    #[error("Invalid player name: {0}")]
    InvalidName(String),

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("Game in room {0} has already started")]
    GameAlreadyStarted(RoomCode),

    #[error("Prompt assignment failed: {0}")]
    Assignment(#[from] AssignError),

    #[error("No free room code found after {0} attempts")]
    CodeSpaceExhausted(u32),

    #[error("Session invariant violated: {0}")]
    Invariant(String),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::RepositoryUnavailable(_) => "REPOSITORY_UNAVAILABLE",
            GameError::StaleSessionReference(_) => "STALE_SESSION",
            GameError::InvalidGuesser => "INVALID_GUESSER",
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::InvalidPhase(_) => "INVALID_PHASE",
            GameError::NotInRoom => "NOT_IN_ROOM",
            GameError::AlreadyInRoom(_) => "ALREADY_IN_ROOM",
            GameError::InvalidName(_) => "INVALID_NAME",
            GameError::InvalidAnswer(_) => "INVALID_ANSWER",
            GameError::GameAlreadyStarted(_) => "GAME_ALREADY_STARTED",
            GameError::Assignment(AssignError::TooFewPlayers(_)) => "NOT_ENOUGH_PLAYERS",
            GameError::Assignment(_) => "ASSIGNMENT_FAILED",
            GameError::CodeSpaceExhausted(_) => "CODE_SPACE_EXHAUSTED",
            GameError::Invariant(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert into the error message sent back to the originating connection
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            code: self.code().to_string(),
            msg: self.to_string(),
        }
    }
}
